//! Transfers bytes between two descriptors to completion or error.

use std::io::{self, Read, Write};

const CHUNK_SIZE: usize = 32 * 1024;

/// Copies all bytes from `src` to `dst` until EOF, retrying short writes
/// and `EINTR` on both sides. Any other I/O error aborts the copy.
pub fn copy<R: Read, W: Write>(mut src: R, mut dst: W) -> io::Result<()> {
    let mut buf = [0u8; CHUNK_SIZE];
    loop {
        let n = loop {
            match src.read(&mut buf) {
                Ok(n) => break n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        };
        if n == 0 {
            return Ok(());
        }
        write_all_retrying(&mut dst, &buf[..n])?;
    }
}

fn write_all_retrying<W: Write>(dst: &mut W, mut buf: &[u8]) -> io::Result<()> {
    while !buf.is_empty() {
        match dst.write(buf) {
            Ok(0) => {
                return Err(io::Error::new(
                    io::ErrorKind::WriteZero,
                    "failed to write whole buffer",
                ));
            }
            Ok(n) => buf = &buf[n..],
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copies_all_bytes() {
        let data = vec![7u8; CHUNK_SIZE * 3 + 17];
        let mut out = Vec::new();
        copy(&data[..], &mut out).unwrap();
        assert_eq!(out, data);
    }

    #[test]
    fn copies_empty_input() {
        let data: [u8; 0] = [];
        let mut out = Vec::new();
        copy(&data[..], &mut out).unwrap();
        assert!(out.is_empty());
    }
}

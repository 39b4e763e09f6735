use crate::conn::Connection;
use std::os::unix::net::UnixStream;

impl Connection for UnixStream {
    type Error = std::io::Error;

    fn peek(&mut self) -> Result<usize, Self::Error> {
        self.set_nonblocking(true)?;

        let mut buf = [0u8; 256];
        match UnixStream::peek(self, &mut buf) {
            Ok(n) => Ok(n),
            Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => Ok(0),
            Err(e) => Err(e),
        }
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        use std::io::Read;

        self.set_nonblocking(false)?;
        Read::read(self, buf)
    }

    fn write_all(&mut self, buf: &[u8]) -> Result<(), Self::Error> {
        use std::io::Write;

        self.set_nonblocking(false)?;
        Write::write_all(self, buf)
    }

    fn poll(&mut self) -> Result<bool, Self::Error> {
        self.set_nonblocking(false)?;

        let mut buf = [0u8];
        UnixStream::peek(self, &mut buf)?;
        Ok(true)
    }
}

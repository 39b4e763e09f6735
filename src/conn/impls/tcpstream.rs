use crate::conn::Connection;
use std::net::TcpStream;

impl Connection for TcpStream {
    type Error = std::io::Error;

    fn peek(&mut self) -> Result<usize, Self::Error> {
        self.set_nonblocking(true)?;

        let mut buf = [0u8; 256];
        match TcpStream::peek(self, &mut buf) {
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

        // a blocking one-byte peek parks the thread until the peer sends
        // something (or hangs up, which also wakes the socket)
        let mut buf = [0u8];
        TcpStream::peek(self, &mut buf)?;
        Ok(true)
    }

    fn on_session_start(&mut self) -> Result<(), Self::Error> {
        self.set_nodelay(true)
    }
}

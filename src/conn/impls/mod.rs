#[cfg(feature = "std")]
mod tcpstream;
#[cfg(all(feature = "std", unix))]
mod unixstream;

use std::io::{self, Read, Write};
use std::net::{IpAddr, Ipv6Addr, SocketAddr};

use crate::consensus::{encode, Decodable, Encodable};

impl Encodable for SocketAddr {
    fn consensus_encode<W: Write + ?Sized>(&self, writer: &mut W) -> Result<usize, io::Error> {
        let ip_address: [u8; 16] = match self.ip() {
            IpAddr::V4(v4) => {
                // IPv4 travels in the IPv6-mapped form ::ffff:a.b.c.d.
                let mut ip_address = [0u8; 16];
                ip_address[10] = 0xff;
                ip_address[11] = 0xff;
                ip_address[12..16].copy_from_slice(&v4.octets());
                ip_address
            }
            IpAddr::V6(v6) => v6.octets(),
        };

        let mut len = 0;
        len += ip_address.consensus_encode(writer)?;
        // The port is the one big-endian field of the entry.
        len += self.port().swap_bytes().consensus_encode(writer)?;
        Ok(len)
    }
}

impl Decodable for SocketAddr {
    fn consensus_decode<R: Read + ?Sized>(reader: &mut R) -> Result<Self, encode::Error> {
        let ip_address: [u8; 16] = Decodable::consensus_decode(reader)?;
        let port: u16 = Decodable::consensus_decode(reader)?;
        let port = port.swap_bytes();
        let v6 = Ipv6Addr::from(ip_address);
        let ip = match v6.to_ipv4_mapped() {
            Some(v4) => IpAddr::V4(v4),
            None => IpAddr::V6(v6),
        };
        Ok(SocketAddr::new(ip, port))
    }
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;

    use crate::consensus::{deserialize, serialize};

    #[test]
    fn ipv4_mapped_roundtrip() {
        let addr: SocketAddr = "1.2.3.4:9999".parse().unwrap();
        let data = serialize(&addr);
        assert_eq!(
            data,
            vec![0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0xff, 0xff, 1, 2, 3, 4, 0x27, 0x0f]
        );
        assert_eq!(deserialize::<SocketAddr>(&data).unwrap(), addr);
    }

    #[test]
    fn ipv6_roundtrip() {
        let addr: SocketAddr = "[2001:db8::1]:19999".parse().unwrap();
        let data = serialize(&addr);
        assert_eq!(deserialize::<SocketAddr>(&data).unwrap(), addr);
    }
}

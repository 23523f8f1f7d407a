use super::reader::{PacketReader, ReaderError};
use std::fmt::Display;

/// QTYPE of a question, kept around as the second half of the cache key.
#[derive(PartialEq, Eq, Debug, Clone, Hash, Copy)]
#[allow(clippy::upper_case_acronyms)]
pub enum QueryType {
    Unknown(u16),
    /// a host address
    A, // 1
    /// an authoritative name server
    NS, // 2
    /// the canonical name for an alias
    CNAME, // 5
    /// start of a zone of authority
    SOA, // 6
    /// a domain name pointer
    PTR, // 12
    /// mail exchange
    MX, // 15
    /// text strings
    TXT, // 16
    AAAA, // 28
    /// service locator
    SRV, // 33
    HTTPS, // 65
}

impl QueryType {
    pub fn into_num(self) -> u16 {
        match self {
            QueryType::Unknown(x) => x,
            QueryType::A => 1,
            QueryType::NS => 2,
            QueryType::CNAME => 5,
            QueryType::SOA => 6,
            QueryType::PTR => 12,
            QueryType::MX => 15,
            QueryType::TXT => 16,
            QueryType::AAAA => 28,
            QueryType::SRV => 33,
            QueryType::HTTPS => 65,
        }
    }

    pub fn from_num(num: u16) -> QueryType {
        match num {
            1 => QueryType::A,
            2 => QueryType::NS,
            5 => QueryType::CNAME,
            6 => QueryType::SOA,
            12 => QueryType::PTR,
            15 => QueryType::MX,
            16 => QueryType::TXT,
            28 => QueryType::AAAA,
            33 => QueryType::SRV,
            65 => QueryType::HTTPS,
            _ => QueryType::Unknown(num),
        }
    }
}

impl Display for QueryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueryType::Unknown(num) => write!(f, "TYPE{num}"),
            QueryType::A => write!(f, "A"),
            QueryType::NS => write!(f, "NS"),
            QueryType::CNAME => write!(f, "CNAME"),
            QueryType::SOA => write!(f, "SOA"),
            QueryType::PTR => write!(f, "PTR"),
            QueryType::MX => write!(f, "MX"),
            QueryType::TXT => write!(f, "TXT"),
            QueryType::AAAA => write!(f, "AAAA"),
            QueryType::SRV => write!(f, "SRV"),
            QueryType::HTTPS => write!(f, "HTTPS"),
        }
    }
}

/// CLASS fields appear in resource records.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum DnsClass {
    /// IN - the Internet
    Internet = 1,
    /// CS - the CSNET class (Obsolete - used only for examples in some obsolete RFCs)
    Csnet = 2,
    /// CH - the CHAOS class
    Chaos = 3,
    /// HS - Hesiod [Dyer 87]
    Hesiod = 4,
}

impl Default for DnsClass {
    fn default() -> Self {
        Self::Internet
    }
}

impl TryFrom<u16> for DnsClass {
    type Error = ReaderError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Internet),
            2 => Ok(Self::Csnet),
            3 => Ok(Self::Chaos),
            4 => Ok(Self::Hesiod),
            other => Err(ReaderError::InvalidClass(other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    /// QNAME, decoded to lowercase labels joined by dots
    pub name: String,
    /// QTYPE of the query
    pub qtype: QueryType,
    /// QCLASS of the query, IN for anything reaching the public internet
    pub qclass: DnsClass,
}

impl Question {
    pub fn read(reader: &mut PacketReader<'_>) -> Result<Self, ReaderError> {
        let name = reader.read_qname()?;
        let qtype = QueryType::from_num(reader.read_u16()?);
        let qclass = DnsClass::try_from(reader.read_u16()?)?;

        Ok(Self {
            name,
            qtype,
            qclass,
        })
    }
}

use super::reader::{PacketReader, ReaderError};

/// Fixed 12 byte header of every DNS message (RFC 1035 4.1.1).
#[derive(Clone, Debug, Default)]
pub struct Header {
    /// Identifier assigned by the program that generates the query, copied
    /// into the corresponding reply so the requester can match up replies
    /// to outstanding queries.
    pub id: u16,

    /// RD Recursion Desired
    pub recursion_desired: bool,
    /// TC TrunCation
    pub truncated_message: bool,
    /// AA Authoritative Answer
    pub authoritative_answer: bool,
    /// OPCODE four bit field specifying the kind of query
    pub opcode: u8,
    /// QR whether this message is a query (false) or a response (true)
    pub response: bool,

    /// RCODE set as part of responses, kept raw since responses are relayed
    /// without being rewritten
    pub response_code: u8,
    pub checking_disabled: bool,
    pub authed_data: bool,
    /// Z Reserved for future use
    pub z: bool,
    /// RA Recursion Available
    pub recursion_available: bool,

    /// QDCOUNT number of entries in the question section
    pub questions: u16,
    /// ANCOUNT number of resource records in the answer section
    pub answers: u16,
    /// NSCOUNT number of records in the authority section
    pub authoritative_entries: u16,
    /// ARCOUNT number of records in the additional section
    pub resource_entries: u16,
}

impl Header {
    pub fn read(reader: &mut PacketReader<'_>) -> Result<Self, ReaderError> {
        let id = reader.read_u16()?;

        let flags = reader.read_u16()?;
        let head = (flags >> 8) as u8;
        let tail = (flags & 0xFF) as u8;

        let questions = reader.read_u16()?;
        let answers = reader.read_u16()?;
        let authoritative_entries = reader.read_u16()?;
        let resource_entries = reader.read_u16()?;

        Ok(Self {
            id,
            recursion_desired: (head & (1 << 0)) > 0,
            truncated_message: (head & (1 << 1)) > 0,
            authoritative_answer: (head & (1 << 2)) > 0,
            opcode: (head >> 3) & 0x0F,
            response: (head & (1 << 7)) > 0,
            response_code: tail & 0x0F,
            checking_disabled: (tail & (1 << 4)) > 0,
            authed_data: (tail & (1 << 5)) > 0,
            z: (tail & (1 << 6)) > 0,
            recursion_available: (tail & (1 << 7)) > 0,
            questions,
            answers,
            authoritative_entries,
            resource_entries,
        })
    }
}

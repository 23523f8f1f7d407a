pub mod header;
pub mod question;
pub mod reader;

use header::Header;
use question::Question;
use reader::{PacketReader, ReaderError};

/// Largest datagram accepted from clients or upstream servers.
pub const MAX_MESSAGE_SIZE: usize = 1024;

/// The part of a DNS message this server interprets: the fixed header and
/// the single question. Everything past the question is carried as opaque
/// bytes.
#[derive(Clone, Debug)]
pub struct Query {
    pub header: Header,
    pub question: Question,
}

impl TryFrom<&[u8]> for Query {
    type Error = ReaderError;

    fn try_from(buffer: &[u8]) -> Result<Self, Self::Error> {
        let mut reader = PacketReader::new(buffer);
        let header = Header::read(&mut reader)?;
        if header.questions != 1 {
            return Err(ReaderError::UnexpectedQuestionCount(header.questions));
        }
        let question = Question::read(&mut reader)?;
        Ok(Self { header, question })
    }
}

#[cfg(test)]
mod tests {
    use super::question::QueryType;
    use super::reader::ReaderError;
    use super::Query;

    // id 0x1234, recursion desired, one question: A example.org IN
    const QUERY: &[u8] = &[
        0x12, 0x34, 0x01, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x07, b'e', b'x',
        b'a', b'm', b'p', b'l', b'e', 0x03, b'o', b'r', b'g', 0x00, 0x00, 0x01, 0x00, 0x01,
    ];

    #[test]
    fn should_parse_simple_query() {
        let query = Query::try_from(QUERY).unwrap();
        assert_eq!(query.header.id, 0x1234);
        assert!(query.header.recursion_desired);
        assert_eq!(query.question.name, "example.org");
        assert_eq!(query.question.qtype, QueryType::A);
    }

    #[test]
    fn should_reject_truncated_datagram() {
        let error = Query::try_from(&QUERY[..5]).unwrap_err();
        assert_eq!(error, ReaderError::EndOfBuffer);
    }

    #[test]
    fn should_reject_multiple_questions() {
        let mut buffer = QUERY.to_vec();
        buffer[5] = 2;
        let error = Query::try_from(buffer.as_slice()).unwrap_err();
        assert_eq!(error, ReaderError::UnexpectedQuestionCount(2));
    }

    #[test]
    fn should_reject_zero_questions() {
        let mut buffer = QUERY.to_vec();
        buffer[5] = 0;
        let error = Query::try_from(buffer.as_slice()).unwrap_err();
        assert_eq!(error, ReaderError::UnexpectedQuestionCount(0));
    }
}

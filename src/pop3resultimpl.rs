use crate::errors::*;
use crate::pop3result::{MessageInfo, POP3Stat};

fn split_pair<'a>(line: &'a str) -> Result<(&'a str, &'a str)> {
    let mut fields = line.split(' ');
    match (fields.next(), fields.next()) {
        (Some(first), Some(second)) => Ok((first, second)),
        _ => bail!(ErrorKind::Parse(
            line.to_string(),
            "expected at least two space separated fields".to_string()
        )),
    }
}

fn parse_count(line: &str, field: &str) -> Result<u32> {
    field.parse::<u32>().map_err(|_| {
        ErrorKind::Parse(line.to_string(), format!("{:?} is not a message count", field)).into()
    })
}

// message numbers start at 1
fn parse_number(line: &str, field: &str) -> Result<u32> {
    match field.parse::<u32>() {
        Ok(number) if number > 0 => Ok(number),
        _ => bail!(ErrorKind::Parse(
            line.to_string(),
            format!("{:?} is not a message number", field)
        )),
    }
}

fn parse_size(line: &str, field: &str) -> Result<u64> {
    field.parse::<u64>().map_err(|_| {
        ErrorKind::Parse(line.to_string(), format!("{:?} is not an octet count", field)).into()
    })
}

impl POP3Stat {
    /// Parses the text of a `+OK nn mm` STAT reply.
    pub fn parse(stat_line: &str) -> Result<POP3Stat> {
        let (count, size) = split_pair(stat_line)?;
        Ok(POP3Stat {
            num_mails: parse_count(stat_line, count)?,
            mbox_size: parse_size(stat_line, size)?,
        })
    }
}

impl MessageInfo {
    /// Parses a `<number> <size>` scan listing line.
    pub fn parse_scan(line: &str) -> Result<MessageInfo> {
        let (number, size) = split_pair(line)?;
        Ok(MessageInfo {
            number: parse_number(line, number)?,
            size: parse_size(line, size)?,
            uid: String::new(),
        })
    }

    /// Parses a `<number> <uid>` unique-id listing line. The uid is opaque.
    pub fn parse_uid(line: &str) -> Result<MessageInfo> {
        let (number, uid) = split_pair(line)?;
        Ok(MessageInfo {
            number: parse_number(line, number)?,
            size: 0,
            uid: uid.to_string(),
        })
    }

    /// Parses every line of a listing; one bad line fails the whole listing.
    pub fn parse_all<F>(lines: &[String], parse: F) -> Result<Vec<MessageInfo>>
    where
        F: Fn(&str) -> Result<MessageInfo>,
    {
        lines.iter().map(|line| parse(line)).collect()
    }
}

/// One entry of a mailbox listing.
///
/// Entries produced by LIST carry `number` and `size`; entries produced by
/// UIDL carry `number` and `uid`. The other field keeps its default value and
/// must not be relied upon.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageInfo {
    pub number: u32,
    pub size: u64,
    pub uid: String,
}

/// Reply to STAT: number of messages and total maildrop size in octets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct POP3Stat {
    pub num_mails: u32,
    pub mbox_size: u64,
}

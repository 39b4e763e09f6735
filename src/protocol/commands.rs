use crate::common::MemAddr;
use crate::protocol::hex::decode_hex;
use crate::protocol::hex::decode_hex_buf;
use crate::target::TracepointType;

/// The packet body could not be parsed as its recognized command's grammar.
/// Reported to the client as an `E 07` (protocol violation) reply.
#[derive(Debug, PartialEq, Eq)]
pub struct ParseError;

/// How a `vCont` action resumes the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeAction {
    Continue,
    Step,
    Stop,
}

/// `qSupported` feature list, lazily split into tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Features<'a>(pub &'a str);

/// A single `name[+|-]` / `name=value` feature token.
#[derive(Debug, PartialEq, Eq)]
pub struct Feature<'a> {
    pub name: &'a str,
    pub val: Option<&'a str>,
    pub supported: bool,
}

impl<'a> Features<'a> {
    /// Iterate over the well-formed tokens, silently skipping anything
    /// malformed (GDB clients occasionally send features this stub has no
    /// grammar for).
    pub fn iter(&self) -> impl Iterator<Item = Feature<'a>> + 'a {
        self.0.split(';').filter_map(|tok| match tok.as_bytes().last() {
            None => None,
            Some(&c) if c == b'+' || c == b'-' || c == b'?' => Some(Feature {
                name: &tok[..tok.len() - 1],
                val: None,
                supported: c == b'+',
            }),
            Some(_) => {
                let (name, val) = tok.split_once('=')?;
                Some(Feature {
                    name,
                    val: Some(val),
                    supported: true,
                })
            }
        })
    }
}

/// A parsed RSP command.
///
/// Payload-carrying variants borrow from the packet buffer; hex payloads
/// (`G`, `M`, `P`, `qRcmd`) are decoded in place during parsing.
#[derive(Debug, PartialEq, Eq)]
pub enum Command<'a> {
    // run control and inspection
    ExtendedMode,
    QuestionMark,
    Cont,
    Step,
    ReadRegisters,
    WriteRegisters(&'a [u8]),
    ReadMem { addr: MemAddr, len: usize },
    WriteMem { addr: MemAddr, data: &'a [u8] },
    ReadReg(u32),
    WriteReg { reg: u32, data: &'a [u8] },
    TracepointSet { ty: TracepointType, addr: MemAddr },
    TracepointClear { ty: TracepointType, addr: MemAddr },
    Restart,
    Kill,
    // queries
    QSupported(Features<'a>),
    QXferFeaturesRead { annex: &'a [u8], offset: usize, length: usize },
    QRcmd(&'a [u8]),
    QTStatus,
    // verbose verbs
    VContQuery(&'static str),
    VCont(ResumeAction),
    /// Anything the stub has no handler for; answered with the empty reply.
    Unknown(&'a [u8]),
}

/// The `q`/`Q` sub-dispatch table.
///
/// Matching is first-prefix-wins, so entries sharing a prefix MUST be
/// ordered longest-first; `q_table_ordering_ok` enforces this at
/// construction time (debug builds) and in the test suite.
#[derive(Clone, Copy)]
enum QKind {
    Supported,
    XferFeaturesRead,
    Rcmd,
    TStatus,
}

const Q_COMMANDS: &[(&str, QKind)] = &[
    ("qSupported", QKind::Supported),
    ("qXfer:features:read", QKind::XferFeaturesRead),
    ("qRcmd", QKind::Rcmd),
    ("qTStatus", QKind::TStatus),
];

/// The `v` verb table: verb name plus the static reply to its `?` query
/// form.
const V_COMMANDS: &[(&str, &str)] = &[("vCont", "vCont;s;c;t")];

/// Check that no earlier (shorter) `q` entry shadows a later entry that it
/// prefixes.
pub(crate) fn q_table_ordering_ok() -> bool {
    for (i, (earlier, _)) in Q_COMMANDS.iter().enumerate() {
        for (later, _) in &Q_COMMANDS[i + 1..] {
            if later.starts_with(earlier) {
                return false;
            }
        }
    }
    true
}

impl<'a> Command<'a> {
    /// Parse a framed packet body (everything between `$` and `#`).
    pub fn from_body(body: &'a mut [u8]) -> Result<Command<'a>, ParseError> {
        if body.is_empty() {
            return Ok(Command::Unknown(body));
        }

        let cmd = match body[0] {
            b'!' => Command::ExtendedMode,
            b'?' => Command::QuestionMark,
            // optional resume addresses are accepted and ignored
            b'c' => Command::Cont,
            b's' => Command::Step,
            b'g' => Command::ReadRegisters,
            b'G' => {
                let data = decode_hex_buf(&mut body[1..]).map_err(|_| ParseError)?;
                Command::WriteRegisters(data)
            }
            b'm' => {
                let args = core::str::from_utf8(&body[1..]).map_err(|_| ParseError)?;
                let (addr, len) = args.split_once(',').ok_or(ParseError)?;
                Command::ReadMem {
                    addr: decode_hex(addr.as_bytes()).map_err(|_| ParseError)?,
                    len: decode_hex(len.as_bytes()).map_err(|_| ParseError)?,
                }
            }
            b'M' => {
                let sep = body.iter().position(|&b| b == b':').ok_or(ParseError)?;
                let (head, tail) = body.split_at_mut(sep);
                let args = core::str::from_utf8(&head[1..]).map_err(|_| ParseError)?;
                let (addr, len) = args.split_once(',').ok_or(ParseError)?;
                let len: usize = decode_hex(len.as_bytes()).map_err(|_| ParseError)?;
                let data = decode_hex_buf(&mut tail[1..]).map_err(|_| ParseError)?;
                if data.len() != len {
                    return Err(ParseError);
                }
                Command::WriteMem {
                    addr: decode_hex(addr.as_bytes()).map_err(|_| ParseError)?,
                    data,
                }
            }
            b'p' => Command::ReadReg(decode_hex(&body[1..]).map_err(|_| ParseError)?),
            b'P' => {
                let sep = body.iter().position(|&b| b == b'=').ok_or(ParseError)?;
                let (head, tail) = body.split_at_mut(sep);
                let reg = decode_hex(&head[1..]).map_err(|_| ParseError)?;
                let data = decode_hex_buf(&mut tail[1..]).map_err(|_| ParseError)?;
                Command::WriteReg { reg, data }
            }
            b'z' | b'Z' => return Self::parse_tracepoint(body),
            b'q' | b'Q' => return Self::parse_q(body),
            b'v' => return Self::parse_v(body),
            b'R' => Command::Restart,
            b'k' => Command::Kill,
            _ => Command::Unknown(body),
        };

        Ok(cmd)
    }

    /// `z T,addr,kind` / `Z T,addr,kind`
    fn parse_tracepoint(body: &'a mut [u8]) -> Result<Command<'a>, ParseError> {
        let set = body[0] == b'Z';

        let ty = match body.get(1) {
            Some(b'0') => TracepointType::ExecSw,
            Some(b'1') => TracepointType::ExecHw,
            Some(b'2') => TracepointType::MemWrite,
            Some(b'3') => TracepointType::MemRead,
            Some(b'4') => TracepointType::MemAccess,
            // unrecognized tracepoint types get the "unsupported" reply
            Some(_) => return Ok(Command::Unknown(body)),
            None => return Err(ParseError),
        };

        let args = core::str::from_utf8(&body[2..]).map_err(|_| ParseError)?;
        let args = args.strip_prefix(',').ok_or(ParseError)?;
        let (addr, kind) = args.split_once(',').ok_or(ParseError)?;
        let addr = decode_hex(addr.as_bytes()).map_err(|_| ParseError)?;
        // the kind operand is validated but carries no meaning here
        let _: u64 = decode_hex(kind.as_bytes()).map_err(|_| ParseError)?;

        Ok(if set {
            Command::TracepointSet { ty, addr }
        } else {
            Command::TracepointClear { ty, addr }
        })
    }

    fn parse_q(body: &'a mut [u8]) -> Result<Command<'a>, ParseError> {
        debug_assert!(q_table_ordering_ok());

        let (at, kind) = match Q_COMMANDS
            .iter()
            .find(|(name, _)| body.starts_with(name.as_bytes()))
        {
            Some(&(name, kind)) => (name.len(), kind),
            None => return Ok(Command::Unknown(body)),
        };

        match kind {
            QKind::Supported => {
                let rest = &body[at..];
                let features = match rest.first() {
                    None => "",
                    Some(b':') => core::str::from_utf8(&rest[1..]).map_err(|_| ParseError)?,
                    Some(_) => return Err(ParseError),
                };
                Ok(Command::QSupported(Features(features)))
            }
            QKind::XferFeaturesRead => {
                // :annex:off,len
                let rest = core::str::from_utf8(&body[at..]).map_err(|_| ParseError)?;
                let rest = rest.strip_prefix(':').ok_or(ParseError)?;
                let (annex, range) = rest.split_once(':').ok_or(ParseError)?;
                let (offset, length) = range.split_once(',').ok_or(ParseError)?;
                // reborrow the annex out of the packet buffer
                let annex_at = at + 1;
                Ok(Command::QXferFeaturesRead {
                    annex: &body[annex_at..annex_at + annex.len()],
                    offset: decode_hex(offset.as_bytes()).map_err(|_| ParseError)?,
                    length: decode_hex(length.as_bytes()).map_err(|_| ParseError)?,
                })
            }
            QKind::Rcmd => match &mut body[at..] {
                [] => Ok(Command::QRcmd(&[])),
                [b',', hex_cmd @ ..] => Ok(Command::QRcmd(
                    decode_hex_buf(hex_cmd).map_err(|_| ParseError)?,
                )),
                _ => Err(ParseError),
            },
            QKind::TStatus => Ok(Command::QTStatus),
        }
    }

    /// `vName?` answers with a static reply; `vName;...` invokes the verb.
    fn parse_v(body: &'a mut [u8]) -> Result<Command<'a>, ParseError> {
        let (name, query_reply) = match V_COMMANDS
            .iter()
            .find(|(name, _)| body.starts_with(name.as_bytes()))
        {
            Some(&v) => v,
            None => return Ok(Command::Unknown(body)),
        };

        let rest = &body[name.len()..];
        match rest.first() {
            Some(b'?') => Ok(Command::VContQuery(query_reply)),
            Some(b';') => {
                // only the first action is honored; thread-id suffixes and
                // further actions are accepted syntactically and ignored
                let action = match rest.get(1) {
                    Some(b'c') => ResumeAction::Continue,
                    Some(b's') => ResumeAction::Step,
                    Some(b't') => ResumeAction::Stop,
                    _ => return Err(ParseError),
                };
                Ok(Command::VCont(action))
            }
            _ => Err(ParseError),
        }
    }
}

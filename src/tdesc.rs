//! Target description XML generation.
//!
//! GDB learns the architecture and register layout of the target by reading
//! the `target.xml` annex via `qXfer:features:read`. The document is derived
//! entirely from the target's [`Arch`] tag and register descriptor table,
//! built once per session, and served out of the cache in offset/length
//! slices.

use alloc::string::String;
use core::fmt;
use core::fmt::Write;

use crate::target::Arch;
use crate::target::RegClass;
use crate::target::RegDesc;

/// A `fmt::Write` sink that only tallies how many bytes it would have
/// written.
struct CountingWriter {
    len: usize,
}

impl fmt::Write for CountingWriter {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.len += s.len();
        Ok(())
    }
}

/// The single emission routine. Running it through [`CountingWriter`] first
/// and a real `String` second keeps the size accounting and the write loop
/// from ever drifting apart.
fn emit<W: Write>(w: &mut W, arch: Arch, regs: &[RegDesc]) -> fmt::Result {
    writeln!(w, r#"<?xml version="1.0"?>"#)?;
    writeln!(w, r#"<!DOCTYPE target SYSTEM "gdb-target.dtd">"#)?;
    writeln!(w, r#"<target version="1.0">"#)?;
    writeln!(w, "<architecture>{}</architecture>", arch.name())?;
    writeln!(w, r#"<feature name="{}">"#, arch.core_feature())?;

    for reg in regs {
        let ptr_type = match reg.class {
            RegClass::ProgramCounter | RegClass::CodePointer => Some("code_ptr"),
            RegClass::StackPointer => Some("data_ptr"),
            RegClass::General | RegClass::Status => None,
        };
        match ptr_type {
            Some(ty) => writeln!(
                w,
                r#"<reg name="{}" bitsize="{}" type="{}"/>"#,
                reg.name, reg.bitsize, ty
            )?,
            None => writeln!(w, r#"<reg name="{}" bitsize="{}"/>"#, reg.name, reg.bitsize)?,
        }
    }

    writeln!(w, "</feature>")?;
    write!(w, "</target>")
}

/// Build the target description document in a single allocation.
pub(crate) fn build(arch: Arch, regs: &[RegDesc]) -> String {
    let mut counter = CountingWriter { len: 0 };
    // neither sink can fail
    let _ = emit(&mut counter, arch, regs);

    let mut xml = String::with_capacity(counter.len);
    let _ = emit(&mut xml, arch, regs);
    debug_assert_eq!(xml.len(), counter.len);

    xml
}

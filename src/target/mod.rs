//! The core [`Target`] trait, and all its related types.
//!
//! `Target` is the stub's view of the thing being debugged: a CPU core, an
//! emulator, a hypervisor vCPU. The trait covers the mandatory surface
//! (run-control, memory, registers, the register descriptor table), while
//! optional capabilities (restart, kill, tracepoints) live in [`ext`] as
//! extension traits that targets opt into by overriding the corresponding
//! `support_*` method to return `Some(self)`.

use crate::common::MemAddr;
use crate::monitor::MonitorOutput;

pub mod ext;

use self::ext::KillOps;
use self::ext::RestartOps;
use self::ext::TracepointsOps;

/// The target's CPU architecture, as reported in the target description.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Arch {
    /// 32-bit ARM.
    Arm,
    /// 32-bit x86.
    X86,
    /// x86-64.
    Amd64,
}

impl Arch {
    /// The `<architecture>` element of the target description.
    pub(crate) fn name(self) -> &'static str {
        match self {
            Arch::Arm => "arm",
            Arch::X86 => "i386",
            Arch::Amd64 => "i386:x86-64",
        }
    }

    /// The `<feature name="...">` wrapping the core register set.
    pub(crate) fn core_feature(self) -> &'static str {
        match self {
            Arch::Arm => "org.gnu.gdb.arm.core",
            // GDB groups x86-64 under the i386 feature namespace
            Arch::X86 | Arch::Amd64 => "org.gnu.gdb.i386.core",
        }
    }

    /// Whether a value from the client's `xmlRegisters=` feature token refers
    /// to this architecture.
    pub(crate) fn matches_xml_registers(self, token: &str) -> bool {
        match self {
            Arch::Arm => token == "arm",
            // GDB advertises the whole x86 family as "i386"
            Arch::X86 => token == "i386",
            Arch::Amd64 => token == "i386" || token == "i386:x86-64",
        }
    }
}

/// The current run-state of the target.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TargetState {
    /// The target is executing.
    Running,
    /// The target is halted and can be inspected.
    Stopped,
}

/// What a tracepoint traps on.
///
/// Wire mapping (the `T` operand of `z`/`Z` packets): `0` software
/// execution, `1` hardware execution, `2` write watch, `3` read watch, `4`
/// access watch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TracepointType {
    /// Software breakpoint on instruction fetch.
    ExecSw,
    /// Hardware breakpoint on instruction fetch.
    ExecHw,
    /// Trap on memory write.
    MemWrite,
    /// Trap on memory read.
    MemRead,
    /// Trap on any memory access.
    MemAccess,
}

/// What happens when a tracepoint is hit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TracepointAction {
    /// Stop the target and hand control back to the debugger.
    Stop,
}

/// The semantic class of a register, used to annotate the target
/// description.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RegClass {
    /// General purpose register.
    General,
    /// The program counter.
    ProgramCounter,
    /// The stack pointer.
    StackPointer,
    /// A code pointer (e.g. a link register).
    CodePointer,
    /// A status/flags register.
    Status,
}

/// Describes a single register in the target's register file.
///
/// The position of a descriptor within [`Target::registers`] is the index
/// the stub passes to [`Target::read_registers`] /
/// [`Target::write_registers`], and the order GDB expects `g`/`G` packet
/// data in.
#[derive(Clone, Copy, Debug)]
pub struct RegDesc {
    /// Register name, as shown in the target description.
    pub name: &'static str,
    /// Register width in bits.
    pub bitsize: u32,
    /// Semantic class.
    pub class: RegClass,
}

impl RegDesc {
    /// Width in bytes, rounding sub-byte registers up.
    pub(crate) fn size_bytes(&self) -> usize {
        (self.bitsize as usize + 7) / 8
    }
}

/// A custom command reachable from the GDB client via `monitor <name>
/// [args]`.
///
/// Output written to the provided [`MonitorOutput`] is sent back to the
/// client console; returning `Err(errno)` produces an `E NN` reply instead.
pub struct MonitorCmd<T: ?Sized> {
    /// Command name, matched against the first whitespace-delimited word of
    /// the `monitor` invocation.
    pub name: &'static str,
    /// One-line description. Purely informational.
    pub desc: Option<&'static str>,
    /// Command handler. `args` is the remainder of the invocation after the
    /// command name, with the separating space stripped.
    pub handler: fn(&mut T, args: &str, out: &mut MonitorOutput) -> Result<(), u8>,
}

/// A non-fatal error which targets can return from any debug operation.
pub enum TargetError<E> {
    /// The operation isn't supported by this target. Reported to the client
    /// as the RSP "empty" reply.
    Unsupported,
    /// An operation-specific error code. Reported to the client as `E NN`.
    Errno(u8),
    /// A target-specific **fatal** error, which aborts
    /// [`GdbStub::run`](crate::stub::GdbStub::run).
    Fatal(E),
}

/// A result type which can flag both fatal and non-fatal target errors.
pub type TargetResult<T, Tgt> = Result<T, TargetError<<Tgt as Target>::Error>>;

/// The set of operations a debug target must provide to the stub.
///
/// Register and memory payloads cross this interface as raw bytes in the
/// target's own byte order; the stub only ever hex-encodes them.
pub trait Target {
    /// A target-specific fatal error.
    type Error;

    /// The architecture tag reported in the target description.
    fn arch(&self) -> Arch;

    /// The ordered register file description.
    ///
    /// The slice must not change over the lifetime of a session: the stub
    /// sizes its register scratch buffers from it once.
    fn registers(&self) -> &'static [RegDesc];

    /// The current run-state.
    ///
    /// Polled at the top of every receive-loop iteration; a transition from
    /// [`TargetState::Running`] to [`TargetState::Stopped`] between polls
    /// causes the stub to emit a spontaneous `S05` stop-reply.
    fn state(&mut self) -> TargetState;

    /// Force the target to stop.
    fn stop(&mut self) -> TargetResult<(), Self>;

    /// Execute a single instruction, then stop.
    fn step(&mut self) -> TargetResult<(), Self>;

    /// Resume execution.
    fn resume(&mut self) -> TargetResult<(), Self>;

    /// Read `buf.len()` bytes from the target address space starting at
    /// `addr`.
    fn read_mem(&mut self, addr: MemAddr, buf: &mut [u8]) -> TargetResult<(), Self>;

    /// Write `data` to the target address space starting at `addr`.
    fn write_mem(&mut self, addr: MemAddr, data: &[u8]) -> TargetResult<(), Self>;

    /// Read the registers named by `regs` (indices into
    /// [`registers`](Target::registers)), packing their values back-to-back
    /// into `buf` in the same order.
    ///
    /// The stub guarantees `buf` is exactly as large as the named registers'
    /// summed byte widths.
    fn read_registers(&mut self, regs: &[u32], buf: &mut [u8]) -> TargetResult<(), Self>;

    /// Write the registers named by `regs`, taking their new values
    /// back-to-back from `data`.
    fn write_registers(&mut self, regs: &[u32], data: &[u8]) -> TargetResult<(), Self>;

    /// Support for restarting the target (`R`, and the `!` extended-mode
    /// handshake).
    fn support_restart(&mut self) -> Option<RestartOps<'_, Self>> {
        None
    }

    /// Support for killing the target (`k`).
    fn support_kill(&mut self) -> Option<KillOps<'_, Self>> {
        None
    }

    /// Support for setting/clearing tracepoints (`Z`/`z`).
    fn support_tracepoints(&mut self) -> Option<TracepointsOps<'_, Self>> {
        None
    }

    /// Custom `monitor` command table.
    fn monitor_commands(&self) -> &[MonitorCmd<Self>]
    where
        Self: Sized,
    {
        &[]
    }
}

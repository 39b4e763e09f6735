//! Wire-level session tests: scripted packet exchanges against an in-memory
//! transport and a canned target.

use rsp_stub::common::MemAddr;
use rsp_stub::conn::Connection;
use rsp_stub::target::ext::Kill;
use rsp_stub::target::ext::KillOps;
use rsp_stub::target::ext::Restart;
use rsp_stub::target::ext::RestartOps;
use rsp_stub::target::ext::Tracepoints;
use rsp_stub::target::ext::TracepointsOps;
use rsp_stub::target::Arch;
use rsp_stub::target::MonitorCmd;
use rsp_stub::target::RegClass;
use rsp_stub::target::RegDesc;
use rsp_stub::target::Target;
use rsp_stub::target::TargetResult;
use rsp_stub::target::TargetState;
use rsp_stub::target::TracepointAction;
use rsp_stub::target::TracepointType;
use rsp_stub::GdbStub;
use rsp_stub::RunExit;

struct TestConn {
    input: Vec<u8>,
    pos: usize,
    out: Vec<u8>,
}

impl TestConn {
    fn new(input: &[u8]) -> TestConn {
        TestConn {
            input: input.to_vec(),
            pos: 0,
            out: Vec::new(),
        }
    }
}

impl Connection for &mut TestConn {
    type Error = ();

    fn peek(&mut self) -> Result<usize, ()> {
        Ok(self.input.len() - self.pos)
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, ()> {
        let n = buf.len().min(self.input.len() - self.pos);
        buf[..n].copy_from_slice(&self.input[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }

    fn write_all(&mut self, buf: &[u8]) -> Result<(), ()> {
        self.out.extend_from_slice(buf);
        Ok(())
    }
}

const TEST_REGS: &[RegDesc] = &[
    RegDesc { name: "r0", bitsize: 8, class: RegClass::General },
    RegDesc { name: "r1", bitsize: 8, class: RegClass::General },
    RegDesc { name: "sp", bitsize: 8, class: RegClass::StackPointer },
    RegDesc { name: "pc", bitsize: 8, class: RegClass::ProgramCounter },
];

#[derive(Default)]
struct TestTarget {
    regs: [u8; 4],
    running: bool,
    stops: usize,
    steps: usize,
    resumes: usize,
    restarts: usize,
    kills: usize,
    reg_reads: usize,
    mem_writes: Vec<(MemAddr, Vec<u8>)>,
    tracepoints: Vec<(MemAddr, TracepointType)>,
}

impl TestTarget {
    fn new() -> TestTarget {
        TestTarget {
            regs: [0x11, 0x22, 0x33, 0x44],
            ..Default::default()
        }
    }
}

impl Target for TestTarget {
    type Error = &'static str;

    fn arch(&self) -> Arch {
        Arch::Arm
    }

    fn registers(&self) -> &'static [RegDesc] {
        TEST_REGS
    }

    fn state(&mut self) -> TargetState {
        if self.running {
            TargetState::Running
        } else {
            TargetState::Stopped
        }
    }

    fn stop(&mut self) -> TargetResult<(), Self> {
        self.stops += 1;
        self.running = false;
        Ok(())
    }

    fn step(&mut self) -> TargetResult<(), Self> {
        self.steps += 1;
        Ok(())
    }

    fn resume(&mut self) -> TargetResult<(), Self> {
        self.resumes += 1;
        // the "program" traps immediately, so the stub's next run-state poll
        // observes a stop
        self.running = false;
        Ok(())
    }

    fn read_mem(&mut self, addr: MemAddr, buf: &mut [u8]) -> TargetResult<(), Self> {
        for (i, b) in buf.iter_mut().enumerate() {
            *b = match addr + i as MemAddr {
                0x1000 => 0xAA,
                0x1001 => 0xBB,
                bad if bad >= 0xdead_0000 => return Err(rsp_stub::target::TargetError::Errno(0x0e)),
                other => other as u8,
            };
        }
        Ok(())
    }

    fn write_mem(&mut self, addr: MemAddr, data: &[u8]) -> TargetResult<(), Self> {
        self.mem_writes.push((addr, data.to_vec()));
        Ok(())
    }

    fn read_registers(&mut self, regs: &[u32], buf: &mut [u8]) -> TargetResult<(), Self> {
        self.reg_reads += 1;
        for (out, &idx) in buf.iter_mut().zip(regs) {
            *out = self.regs[idx as usize];
        }
        Ok(())
    }

    fn write_registers(&mut self, regs: &[u32], data: &[u8]) -> TargetResult<(), Self> {
        for (&val, &idx) in data.iter().zip(regs) {
            self.regs[idx as usize] = val;
        }
        Ok(())
    }

    fn support_restart(&mut self) -> Option<RestartOps<'_, Self>> {
        Some(self)
    }

    fn support_kill(&mut self) -> Option<KillOps<'_, Self>> {
        Some(self)
    }

    fn support_tracepoints(&mut self) -> Option<TracepointsOps<'_, Self>> {
        Some(self)
    }

    fn monitor_commands(&self) -> &[MonitorCmd<Self>] {
        const CMDS: &[MonitorCmd<TestTarget>] = &[
            MonitorCmd {
                name: "echo",
                desc: Some("echo the arguments back"),
                handler: |_t, args, out| {
                    rsp_stub::output!(out, "{}", args);
                    Ok(())
                },
            },
            MonitorCmd {
                name: "silent",
                desc: None,
                handler: |_t, _args, _out| Ok(()),
            },
            MonitorCmd {
                name: "fail",
                desc: None,
                handler: |_t, _args, _out| Err(0x33),
            },
        ];
        CMDS
    }
}

impl Restart for TestTarget {
    fn restart(&mut self) -> TargetResult<(), Self> {
        self.restarts += 1;
        Ok(())
    }
}

impl Kill for TestTarget {
    fn kill(&mut self) -> TargetResult<(), Self> {
        self.kills += 1;
        Ok(())
    }
}

impl Tracepoints for TestTarget {
    fn tracepoint_set(
        &mut self,
        addr: MemAddr,
        ty: TracepointType,
        _action: TracepointAction,
    ) -> TargetResult<(), Self> {
        self.tracepoints.push((addr, ty));
        Ok(())
    }

    fn tracepoint_clear(&mut self, addr: MemAddr) -> TargetResult<(), Self> {
        self.tracepoints.retain(|&(a, _)| a != addr);
        Ok(())
    }
}

fn checksum(body: &[u8]) -> u8 {
    body.iter().fold(0u8, |a, x| a.wrapping_add(*x))
}

/// Frame a packet the way a GDB client would (lowercase checksum digits).
fn pkt(body: &str) -> Vec<u8> {
    format!("${}#{:02x}", body, checksum(body.as_bytes())).into_bytes()
}

/// Frame a reply the way the stub does (uppercase checksum digits).
fn reply(body: &str) -> Vec<u8> {
    format!("${}#{:02X}", body, checksum(body.as_bytes())).into_bytes()
}

fn run_session(target: &mut TestTarget, input: &[u8]) -> (Vec<u8>, RunExit) {
    let mut conn = TestConn::new(input);
    let mut stub = GdbStub::new(&mut conn);
    let exit = stub.run(target).expect("session error");
    drop(stub);
    (conn.out.clone(), exit)
}

#[test]
fn scenario_qsupported() {
    let mut target = TestTarget::new();
    let (out, exit) = run_session(&mut target, b"$qSupported#37");

    assert_eq!(exit, RunExit::TryAgain);
    let mut expected = b"+".to_vec();
    expected.extend(reply("qXfer:features:read+"));
    assert_eq!(out, expected);
}

#[test]
fn scenario_qsupported_with_features() {
    let mut target = TestTarget::new();
    let (out, _) = run_session(
        &mut target,
        &pkt("qSupported:multiprocess+;xmlRegisters=i386,arm;swbreak+"),
    );

    let mut expected = b"+".to_vec();
    expected.extend(reply("qXfer:features:read+"));
    assert_eq!(out, expected);
}

#[test]
fn scenario_read_all_registers() {
    let mut target = TestTarget::new();
    let (out, _) = run_session(&mut target, b"$g#67");

    let mut expected = b"+".to_vec();
    expected.extend(b"$11223344#94");
    assert_eq!(out, expected);
    // the whole register file is one target call
    assert_eq!(target.reg_reads, 1);
}

#[test]
fn scenario_memory_read() {
    let mut target = TestTarget::new();
    let (out, _) = run_session(&mut target, &pkt("m1000,2"));

    let mut expected = b"+".to_vec();
    expected.extend(b"$AABB#06");
    assert_eq!(out, expected);
}

#[test]
fn scenario_bad_checksum() {
    let mut target = TestTarget::new();
    let (out, _) = run_session(&mut target, b"$g#00");

    assert_eq!(out, b"-");
    // the dispatcher must not have run
    assert_eq!(target.reg_reads, 0);
}

#[test]
fn scenario_out_of_band_stop() {
    let mut target = TestTarget::new();
    let (out, _) = run_session(&mut target, b"\x03");

    assert_eq!(out, b"$S05#B8");
    assert_eq!(target.stops, 1);
}

#[test]
fn scenario_vcont() {
    let mut target = TestTarget::new();
    let (out, _) = run_session(&mut target, &pkt("vCont?"));

    let mut expected = b"+".to_vec();
    expected.extend(reply("vCont;s;c;t"));
    assert_eq!(out, expected);

    // `vCont;c` resumes with no reply; the immediate trap then surfaces as
    // a spontaneous stop-reply on the next loop iteration
    let (out, _) = run_session(&mut target, &pkt("vCont;c"));
    assert_eq!(target.resumes, 1);
    let mut expected = b"+".to_vec();
    expected.extend(b"$S05#B8");
    assert_eq!(out, expected);
}

#[test]
fn continue_then_spontaneous_stop() {
    let mut target = TestTarget::new();
    let (out, _) = run_session(&mut target, &pkt("c"));

    assert_eq!(target.resumes, 1);
    let mut expected = b"+".to_vec();
    expected.extend(b"$S05#B8");
    assert_eq!(out, expected);
}

#[test]
fn step_replies_with_stop() {
    let mut target = TestTarget::new();
    let (out, _) = run_session(&mut target, &pkt("s"));

    assert_eq!(target.steps, 1);
    let mut expected = b"+".to_vec();
    expected.extend(b"$S05#B8");
    assert_eq!(out, expected);
}

#[test]
fn stop_reason_query() {
    let mut target = TestTarget::new();
    let (out, _) = run_session(&mut target, &pkt("?"));

    let mut expected = b"+".to_vec();
    expected.extend(b"$S05#B8");
    assert_eq!(out, expected);
}

#[test]
fn write_registers_roundtrip() {
    let mut target = TestTarget::new();
    let (out, _) = run_session(&mut target, &pkt("GDEADBEEF"));

    let mut expected = b"+".to_vec();
    expected.extend(reply("OK"));
    assert_eq!(out, expected);
    assert_eq!(target.regs, [0xDE, 0xAD, 0xBE, 0xEF]);
}

#[test]
fn write_registers_length_mismatch_is_a_protocol_violation() {
    let mut target = TestTarget::new();
    let (out, _) = run_session(&mut target, &pkt("GDEAD"));

    let mut expected = b"+".to_vec();
    expected.extend(reply("E07"));
    assert_eq!(out, expected);
    assert_eq!(target.regs, [0x11, 0x22, 0x33, 0x44]);
}

#[test]
fn single_register_access() {
    let mut target = TestTarget::new();
    let (out, _) = run_session(&mut target, &pkt("p2"));

    let mut expected = b"+".to_vec();
    expected.extend(reply("33"));
    assert_eq!(out, expected);

    let (out, _) = run_session(&mut target, &pkt("P2=7f"));
    let mut expected = b"+".to_vec();
    expected.extend(reply("OK"));
    assert_eq!(out, expected);
    assert_eq!(target.regs[2], 0x7f);
}

#[test]
fn out_of_range_register_index() {
    let mut target = TestTarget::new();
    let (out, _) = run_session(&mut target, &pkt("p99"));

    let mut expected = b"+".to_vec();
    expected.extend(reply("E07"));
    assert_eq!(out, expected);
}

#[test]
fn memory_write() {
    let mut target = TestTarget::new();
    let (out, _) = run_session(&mut target, &pkt("M2000,3:010203"));

    let mut expected = b"+".to_vec();
    expected.extend(reply("OK"));
    assert_eq!(out, expected);
    assert_eq!(target.mem_writes, vec![(0x2000, vec![1, 2, 3])]);
}

#[test]
fn memory_read_target_error_becomes_enn() {
    let mut target = TestTarget::new();
    let (out, _) = run_session(&mut target, &pkt("mdead0000,4"));

    let mut expected = b"+".to_vec();
    expected.extend(reply("E0E"));
    assert_eq!(out, expected);
}

#[test]
fn tracepoint_set_and_clear() {
    let mut target = TestTarget::new();
    let input: Vec<u8> = [pkt("Z0,4000,4"), pkt("Z2,8000,4"), pkt("z0,4000,4")].concat();
    let (out, _) = run_session(&mut target, &input);

    let ok: Vec<u8> = [b"+".to_vec(), reply("OK")].concat();
    assert_eq!(out, [ok.clone(), ok.clone(), ok].concat());
    assert_eq!(target.tracepoints, vec![(0x8000, TracepointType::MemWrite)]);
}

#[test]
fn extended_mode_and_restart() {
    let mut target = TestTarget::new();
    let input: Vec<u8> = [pkt("!"), pkt("R00")].concat();
    let (out, _) = run_session(&mut target, &input);

    // `!` gets OK, `R` gets nothing
    let mut expected = b"+".to_vec();
    expected.extend(reply("OK"));
    expected.extend(b"+");
    assert_eq!(out, expected);
    assert_eq!(target.restarts, 1);
}

#[test]
fn restart_outside_extended_mode_is_ignored() {
    let mut target = TestTarget::new();
    let (out, _) = run_session(&mut target, &pkt("R00"));

    assert_eq!(out, b"+");
    assert_eq!(target.restarts, 0);
}

#[test]
fn kill_terminates_the_session() {
    let mut target = TestTarget::new();
    let (out, exit) = run_session(&mut target, &pkt("k"));

    assert_eq!(exit, RunExit::Kill);
    assert_eq!(out, b"+");
    assert_eq!(target.kills, 1);
}

#[test]
fn monitor_command_output_is_hex_encoded() {
    let mut target = TestTarget::new();

    // "echo hi"
    let (out, _) = run_session(&mut target, &pkt("qRcmd,6563686f206869"));
    let mut expected = b"+".to_vec();
    // "hi", hex-encoded
    expected.extend(reply("6869"));
    assert_eq!(out, expected);
}

#[test]
fn monitor_command_with_no_output_replies_ok() {
    let mut target = TestTarget::new();

    // "silent"
    let (out, _) = run_session(&mut target, &pkt("qRcmd,73696c656e74"));
    let mut expected = b"+".to_vec();
    expected.extend(reply("OK"));
    assert_eq!(out, expected);
}

#[test]
fn monitor_command_failure_and_not_found() {
    let mut target = TestTarget::new();

    // "fail"
    let (out, _) = run_session(&mut target, &pkt("qRcmd,6661696c"));
    let mut expected = b"+".to_vec();
    expected.extend(reply("E33"));
    assert_eq!(out, expected);

    // "nonesuch"
    let (out, _) = run_session(&mut target, &pkt("qRcmd,6e6f6e6573756368"));
    let mut expected = b"+".to_vec();
    expected.extend(reply("E09"));
    assert_eq!(out, expected);
}

#[test]
fn qtstatus_reports_no_trace_experiment() {
    let mut target = TestTarget::new();
    let (out, _) = run_session(&mut target, &pkt("qTStatus"));

    let mut expected = b"+".to_vec();
    expected.extend(reply("T0"));
    assert_eq!(out, expected);
}

#[test]
fn target_description_negotiation_and_transfer() {
    let mut target = TestTarget::new();

    // negotiate, then pull the description in two chunks
    let negotiate = pkt("qSupported:xmlRegisters=arm");
    let first = pkt("qXfer:features:read:target.xml:0,40");
    let (out, _) = run_session(&mut target, &[negotiate, first].concat());

    let out = String::from_utf8(out).unwrap();
    // chunked read: more data follows
    assert!(out.contains("$m<?xml"));

    // a read past the end is just "l"
    let (out, _) = run_session(&mut target, &pkt("qXfer:features:read:target.xml:8000,40"));
    let mut expected = b"+".to_vec();
    expected.extend(reply("l"));
    assert_eq!(out, expected);
}

#[test]
fn full_target_description_content() {
    let mut target = TestTarget::new();
    let (out, _) = run_session(
        &mut target,
        &pkt("qXfer:features:read:target.xml:0,ffff"),
    );

    let out = String::from_utf8(out).unwrap();
    assert!(out.contains("$l<?xml"));
    assert!(out.contains("<architecture>arm</architecture>"));
    assert!(out.contains(r#"<feature name="org.gnu.gdb.arm.core">"#));
    assert!(out.contains(r#"<reg name="pc" bitsize="8" type="code_ptr"/>"#));
}

#[test]
fn unsupported_annex_gets_e00() {
    let mut target = TestTarget::new();
    let (out, _) = run_session(&mut target, &pkt("qXfer:features:read:cpu.xml:0,40"));

    let mut expected = b"+".to_vec();
    expected.extend(reply("E00"));
    assert_eq!(out, expected);
}

#[test]
fn unknown_commands_get_the_empty_reply() {
    let mut target = TestTarget::new();
    let input: Vec<u8> = [pkt("Hg0"), pkt("qAttached"), pkt("vMustReplyEmpty")].concat();
    let (out, _) = run_session(&mut target, &input);

    let empty: Vec<u8> = [b"+".to_vec(), b"$#00".to_vec()].concat();
    assert_eq!(out, [empty.clone(), empty.clone(), empty].concat());
}

#[test]
fn malformed_body_is_a_protocol_violation() {
    let mut target = TestTarget::new();
    let (out, _) = run_session(&mut target, &pkt("m10zz,2"));

    let mut expected = b"+".to_vec();
    expected.extend(reply("E07"));
    assert_eq!(out, expected);
}

#[test]
fn acks_and_garbage_between_packets_are_discarded() {
    let mut target = TestTarget::new();
    let mut input = b"+++".to_vec();
    input.extend(pkt("g"));
    input.extend(b"-junk-");
    let (out, _) = run_session(&mut target, &input);

    let mut expected = b"+".to_vec();
    expected.extend(b"$11223344#94");
    assert_eq!(out, expected);
}

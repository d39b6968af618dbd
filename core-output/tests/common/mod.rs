//! Shared recording backend for the output core tests.

#![allow(dead_code)]

use bridge_traits::encoding::Encoding;
use bridge_traits::output::{
    AudioOutput, ModuleInfo, OutputModule, Status, StreamParams, STATUS_ERR, STATUS_OK,
};
use core_output::{AudioHandle, EventLoop, Fault, OutputBinding, ScriptCallback, ScriptValue};
use core_runtime::config::{FlushReporting, OutputConfig};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// A backend primitive invocation, in the order the backend saw it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Init(StreamParams),
    Open,
    Write { len: usize, thread: Option<String> },
    Flush,
    Close,
    Deinit,
    GetFormats,
}

/// Knobs for [`RecordingModule`].
#[derive(Debug, Clone)]
pub struct Behavior {
    pub init_status: Option<Status>,
    pub open_status: Status,
    pub has_flush: bool,
    pub has_deinit: bool,
    pub deinit_status: Status,
    /// Largest count a single write reports.
    pub max_write: Option<usize>,
    pub write_delay: Option<Duration>,
    pub panic_on_write: bool,
    pub formats: i32,
}

impl Default for Behavior {
    fn default() -> Self {
        Self {
            init_status: None,
            open_status: STATUS_OK,
            has_flush: true,
            has_deinit: true,
            deinit_status: STATUS_OK,
            max_write: None,
            write_delay: None,
            panic_on_write: false,
            formats: Encoding::Signed16.code() | Encoding::Float32.code(),
        }
    }
}

/// Backend that records every primitive call into a shared log.
pub struct RecordingModule {
    info: ModuleInfo,
    behavior: Behavior,
    log: Arc<Mutex<Vec<Call>>>,
}

impl RecordingModule {
    pub fn new(behavior: Behavior) -> Self {
        Self {
            info: ModuleInfo::new(2, "recording", "Records backend calls", "7"),
            behavior,
            log: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn log(&self) -> Arc<Mutex<Vec<Call>>> {
        Arc::clone(&self.log)
    }
}

impl OutputModule for RecordingModule {
    fn info(&self) -> &ModuleInfo {
        &self.info
    }

    fn init(&self, params: &StreamParams) -> Result<Box<dyn AudioOutput>, Status> {
        self.log.lock().unwrap().push(Call::Init(*params));
        if let Some(status) = self.behavior.init_status {
            return Err(status);
        }
        if params.encoding().is_none() {
            return Err(STATUS_ERR);
        }
        Ok(Box::new(RecordingOutput {
            behavior: self.behavior.clone(),
            log: Arc::clone(&self.log),
        }))
    }
}

struct RecordingOutput {
    behavior: Behavior,
    log: Arc<Mutex<Vec<Call>>>,
}

impl RecordingOutput {
    fn record(&self, call: Call) {
        self.log.lock().unwrap().push(call);
    }
}

impl AudioOutput for RecordingOutput {
    fn open(&mut self, _params: &StreamParams) -> Status {
        self.record(Call::Open);
        self.behavior.open_status
    }

    fn write(&mut self, buffer: &[u8]) -> i32 {
        if self.behavior.panic_on_write {
            panic!("device unplugged");
        }
        if let Some(delay) = self.behavior.write_delay {
            std::thread::sleep(delay);
        }
        self.record(Call::Write {
            len: buffer.len(),
            thread: std::thread::current().name().map(str::to_string),
        });
        let written = self
            .behavior
            .max_write
            .map_or(buffer.len(), |max| buffer.len().min(max));
        written as i32
    }

    fn supports_flush(&self) -> bool {
        self.behavior.has_flush
    }

    fn flush(&mut self) {
        self.record(Call::Flush);
    }

    fn close(&mut self) {
        self.record(Call::Close);
    }

    fn supports_deinit(&self) -> bool {
        self.behavior.has_deinit
    }

    fn deinit(&mut self) -> Status {
        self.record(Call::Deinit);
        self.behavior.deinit_status
    }

    fn get_formats(&self, _params: &StreamParams) -> i32 {
        self.record(Call::GetFormats);
        self.behavior.formats
    }
}

pub struct Harness {
    pub binding: OutputBinding,
    pub event_loop: EventLoop,
    pub log: Arc<Mutex<Vec<Call>>>,
    pub faults: Arc<Mutex<Vec<Fault>>>,
}

impl Harness {
    pub fn new(behavior: Behavior) -> Self {
        Self::with_reporting(behavior, FlushReporting::Observed)
    }

    pub fn with_reporting(behavior: Behavior, reporting: FlushReporting) -> Self {
        let module = RecordingModule::new(behavior);
        let log = module.log();
        let config = OutputConfig::builder()
            .output_module(Arc::new(module))
            .worker_threads(2)
            .shutdown_timeout(Duration::from_secs(5))
            .flush_reporting(reporting)
            .build()
            .unwrap();

        let (binding, event_loop) = OutputBinding::initialize(&config).unwrap();
        let faults = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&faults);
        let event_loop =
            event_loop.with_fault_handler(move |fault: Fault| sink.lock().unwrap().push(fault));

        // Registration probes the backend; tests only care about what follows.
        log.lock().unwrap().clear();

        Self {
            binding,
            event_loop,
            log,
            faults,
        }
    }

    pub fn open_default(&self) -> AudioHandle {
        let handle = AudioHandle::new();
        let status = self
            .binding
            .open(&handle, 2, 44100, Encoding::Signed16.code())
            .unwrap();
        assert_eq!(status, STATUS_OK);
        handle
    }

    pub fn calls(&self) -> Vec<Call> {
        self.log.lock().unwrap().clone()
    }

    pub fn faults(&self) -> Vec<Fault> {
        self.faults.lock().unwrap().clone()
    }
}

/// A callback that forwards its arguments to the returned receiver.
pub fn capture() -> (ScriptCallback, mpsc::Receiver<Vec<ScriptValue>>) {
    let (tx, rx) = mpsc::channel();
    let callback = ScriptCallback::from_fn(move |args| {
        tx.send(args.to_vec()).unwrap();
    });
    (callback, rx)
}

/// The single integer a completion callback received.
pub fn single_int(rx: &mpsc::Receiver<Vec<ScriptValue>>) -> i32 {
    let args = rx.try_recv().expect("callback did not fire");
    assert_eq!(args.len(), 1, "callback takes exactly one argument");
    args[0].as_i32().expect("integer argument")
}

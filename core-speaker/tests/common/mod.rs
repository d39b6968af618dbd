//! Recording backend and helpers shared by the speaker tests.

#![allow(dead_code)]

use bridge_traits::encoding::Encoding;
use bridge_traits::output::{
    AudioOutput, ModuleInfo, OutputModule, Status, StreamParams, STATUS_ERR, STATUS_OK,
};
use core_output::{EventLoop, OutputBinding};
use core_runtime::config::OutputConfig;
use core_speaker::{Result, Speaker, SpeakerOptions};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Init(StreamParams),
    Open,
    Write(usize),
    Flush,
    Close,
    Deinit,
}

#[derive(Debug, Clone)]
pub struct Behavior {
    pub open_status: Status,
    /// Largest count a single write reports.
    pub max_write: Option<usize>,
    pub formats: i32,
}

impl Default for Behavior {
    fn default() -> Self {
        Self {
            open_status: STATUS_OK,
            max_write: None,
            formats: Encoding::Signed16.code() | Encoding::Float32.code(),
        }
    }
}

pub struct RecordingModule {
    info: ModuleInfo,
    behavior: Behavior,
    log: Arc<Mutex<Vec<Call>>>,
}

impl OutputModule for RecordingModule {
    fn info(&self) -> &ModuleInfo {
        &self.info
    }

    fn init(&self, params: &StreamParams) -> std::result::Result<Box<dyn AudioOutput>, Status> {
        self.log.lock().unwrap().push(Call::Init(*params));
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
        self.record(Call::Write(buffer.len()));
        self.behavior
            .max_write
            .map_or(buffer.len(), |max| buffer.len().min(max)) as i32
    }

    fn supports_flush(&self) -> bool {
        true
    }

    fn flush(&mut self) {
        self.record(Call::Flush);
    }

    fn close(&mut self) {
        self.record(Call::Close);
    }

    fn supports_deinit(&self) -> bool {
        true
    }

    fn deinit(&mut self) -> Status {
        self.record(Call::Deinit);
        STATUS_OK
    }

    fn get_formats(&self, _params: &StreamParams) -> i32 {
        self.behavior.formats
    }
}

pub struct Rig {
    pub speaker: Speaker,
    pub event_loop: EventLoop,
    pub log: Arc<Mutex<Vec<Call>>>,
}

impl Rig {
    pub fn new(behavior: Behavior, options: SpeakerOptions) -> Self {
        let log = Arc::new(Mutex::new(Vec::new()));
        let module = RecordingModule {
            info: ModuleInfo::new(2, "recording", "Records backend calls", "7"),
            behavior,
            log: Arc::clone(&log),
        };
        let config = OutputConfig::builder()
            .output_module(Arc::new(module))
            .worker_threads(2)
            .build()
            .unwrap();
        let (binding, event_loop) = OutputBinding::initialize(&config).unwrap();
        log.lock().unwrap().clear();

        let speaker = Speaker::new(binding, &options).unwrap();
        Self {
            speaker,
            event_loop,
            log,
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.log.lock().unwrap().clone()
    }

    pub fn writes(&self) -> Vec<usize> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Write(len) => Some(len),
                _ => None,
            })
            .collect()
    }
}

/// A `done` that forwards its result to the returned receiver.
pub fn completion() -> (
    impl FnOnce(Result<()>) + Send + 'static,
    mpsc::Receiver<Result<()>>,
) {
    let (tx, rx) = mpsc::channel();
    (
        move |result: Result<()>| {
            tx.send(result).unwrap();
        },
        rx,
    )
}

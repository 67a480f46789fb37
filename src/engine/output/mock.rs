use std::cell::RefCell;
use std::rc::Rc;

use crate::engine::config::SampleFormat;
use crate::engine::output::{AudioBackend, AudioDevice, ErrorCode, Status};

/// A backend call as seen by [`MockBackend`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    CreateDevice { app_name: String, stream_name: String },
    Open { sample_rate: u32, channels: u8 },
    Write(usize),
    Drain,
    Close,
    Destroy,
    DescribeError(i32),
}

#[derive(Debug, Default)]
struct Script {
    no_device: bool,
    open_code: i32,
    /// (1-based write index, code)
    write_failure: Option<(usize, i32)>,
    drain_code: i32,
}

#[derive(Debug, Default)]
struct Shared {
    calls: Vec<Call>,
    writes: usize,
    script: Script,
}

/// Journals every call and fails the ones it was told to.
#[derive(Debug, Clone, Default)]
pub struct MockBackend {
    shared: Rc<RefCell<Shared>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn without_device(self) -> Self {
        self.shared.borrow_mut().script.no_device = true;
        self
    }

    pub fn failing_open(self, code: i32) -> Self {
        self.shared.borrow_mut().script.open_code = code;
        self
    }

    pub fn failing_write(self, nth: usize, code: i32) -> Self {
        self.shared.borrow_mut().script.write_failure = Some((nth, code));
        self
    }

    pub fn failing_drain(self, code: i32) -> Self {
        self.shared.borrow_mut().script.drain_code = code;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.shared.borrow().calls.clone()
    }

    pub fn count(&self, call: &Call) -> usize {
        self.shared.borrow().calls.iter().filter(|c| *c == call).count()
    }

    /// Byte counts of all write calls, in order.
    pub fn writes(&self) -> Vec<usize> {
        self.shared
            .borrow()
            .calls
            .iter()
            .filter_map(|c| match c {
                Call::Write(len) => Some(*len),
                _ => None,
            })
            .collect()
    }
}

impl AudioBackend for MockBackend {
    type Device = MockDevice;

    fn create_device(&self, app_name: &str, stream_name: &str) -> Option<MockDevice> {
        let mut shared = self.shared.borrow_mut();
        shared.calls.push(Call::CreateDevice {
            app_name: app_name.to_string(),
            stream_name: stream_name.to_string(),
        });
        if shared.script.no_device {
            return None;
        }
        Some(MockDevice {
            shared: Rc::clone(&self.shared),
        })
    }
}

#[derive(Debug)]
pub struct MockDevice {
    shared: Rc<RefCell<Shared>>,
}

impl AudioDevice for MockDevice {
    fn open(&mut self, _format: SampleFormat, sample_rate: u32, channels: u8) -> Status {
        let mut shared = self.shared.borrow_mut();
        shared.calls.push(Call::Open {
            sample_rate,
            channels,
        });
        ErrorCode::check(shared.script.open_code)
    }

    fn close(&mut self) {
        self.shared.borrow_mut().calls.push(Call::Close);
    }

    fn write(&mut self, data: &[u8]) -> Status {
        let mut shared = self.shared.borrow_mut();
        shared.calls.push(Call::Write(data.len()));
        shared.writes += 1;
        match shared.script.write_failure {
            Some((nth, code)) if nth == shared.writes => ErrorCode::check(code),
            _ => Ok(()),
        }
    }

    fn drain(&mut self) -> Status {
        let mut shared = self.shared.borrow_mut();
        shared.calls.push(Call::Drain);
        ErrorCode::check(shared.script.drain_code)
    }

    fn describe_error(&self, code: ErrorCode) -> String {
        self.shared
            .borrow_mut()
            .calls
            .push(Call::DescribeError(code.raw()));
        format!("mock error {code}")
    }

    fn destroy(self) {
        self.shared.borrow_mut().calls.push(Call::Destroy);
    }
}

//! Scripted in-memory device used by unit tests.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::client::{BitClient, Connector, Endpoint};
use crate::error::ClientError;
use crate::memory::BitArea;

/// A request as seen by the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    ReadDiscreteInputs { start: u16, count: u16 },
    ReadCoils { start: u16, count: u16 },
    WriteCoil { address: u16, value: bool },
    WriteCoils { start: u16, values: Vec<bool> },
    Close,
}

impl Request {
    pub fn is_write(&self) -> bool {
        matches!(self, Request::WriteCoil { .. } | Request::WriteCoils { .. })
    }

    pub fn is_read(&self) -> bool {
        matches!(
            self,
            Request::ReadDiscreteInputs { .. } | Request::ReadCoils { .. }
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    Timeout,
    Exception,
}

impl Fault {
    fn to_error(self) -> ClientError {
        match self {
            Fault::Timeout => ClientError::Timeout,
            Fault::Exception => ClientError::exception("Illegal data address"),
        }
    }
}

#[derive(Debug, Default)]
struct DeviceState {
    discrete_inputs: Vec<bool>,
    coils: Vec<bool>,
    requests: Vec<Request>,
    connects: usize,
    fail_connects: bool,
    read_fault: Option<(BitArea, Fault)>,
    coil_write_faults: HashMap<u16, Fault>,
    bulk_write_fault: Option<Fault>,
}

fn slice(bits: &[bool], start: u16, count: u16) -> Vec<bool> {
    (0..usize::from(count))
        .map(|i| bits.get(usize::from(start) + i).copied().unwrap_or(false))
        .collect()
}

fn store(bits: &mut Vec<bool>, address: usize, value: bool) {
    if bits.len() <= address {
        bits.resize(address + 1, false);
    }
    bits[address] = value;
}

/// Connector handing out clients that share one simulated device.
#[derive(Debug, Clone, Default)]
pub struct MockConnector {
    state: Rc<RefCell<DeviceState>>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_discrete_inputs(&self, bits: &[bool]) {
        self.state.borrow_mut().discrete_inputs = bits.to_vec();
    }

    pub fn set_coils(&self, bits: &[bool]) {
        self.state.borrow_mut().coils = bits.to_vec();
    }

    pub fn coils(&self) -> Vec<bool> {
        self.state.borrow().coils.clone()
    }

    pub fn fail_connects(&self, fail: bool) {
        self.state.borrow_mut().fail_connects = fail;
    }

    pub fn fail_reads(&self, fault: Option<(BitArea, Fault)>) {
        self.state.borrow_mut().read_fault = fault;
    }

    pub fn fail_coil_write(&self, address: u16, fault: Fault) {
        self.state.borrow_mut().coil_write_faults.insert(address, fault);
    }

    pub fn clear_coil_write_faults(&self) {
        self.state.borrow_mut().coil_write_faults.clear();
    }

    pub fn fail_bulk_writes(&self, fault: Option<Fault>) {
        self.state.borrow_mut().bulk_write_fault = fault;
    }

    pub fn connect_count(&self) -> usize {
        self.state.borrow().connects
    }

    pub fn requests(&self) -> Vec<Request> {
        self.state.borrow().requests.clone()
    }

    pub fn writes(&self) -> Vec<Request> {
        self.requests().into_iter().filter(Request::is_write).collect()
    }

    pub fn reads(&self) -> Vec<Request> {
        self.requests().into_iter().filter(Request::is_read).collect()
    }

    pub fn clear_requests(&self) {
        self.state.borrow_mut().requests.clear();
    }
}

impl Connector for MockConnector {
    type Client = MockClient;

    fn connect(&self, _endpoint: &Endpoint) -> Result<MockClient, ClientError> {
        let mut state = self.state.borrow_mut();
        state.connects += 1;
        if state.fail_connects {
            return Err(ClientError::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "connection refused",
            )));
        }
        Ok(MockClient {
            state: Rc::clone(&self.state),
        })
    }
}

#[derive(Debug)]
pub struct MockClient {
    state: Rc<RefCell<DeviceState>>,
}

impl MockClient {
    fn read(&mut self, area: BitArea, start: u16, count: u16) -> Result<Vec<bool>, ClientError> {
        let mut state = self.state.borrow_mut();
        state.requests.push(match area {
            BitArea::DiscreteInputs => Request::ReadDiscreteInputs { start, count },
            BitArea::Coils => Request::ReadCoils { start, count },
        });
        if let Some((failing, fault)) = state.read_fault {
            if failing == area {
                return Err(fault.to_error());
            }
        }
        Ok(match area {
            BitArea::DiscreteInputs => slice(&state.discrete_inputs, start, count),
            BitArea::Coils => slice(&state.coils, start, count),
        })
    }
}

impl BitClient for MockClient {
    fn read_discrete_inputs(&mut self, start: u16, count: u16) -> Result<Vec<bool>, ClientError> {
        self.read(BitArea::DiscreteInputs, start, count)
    }

    fn read_coils(&mut self, start: u16, count: u16) -> Result<Vec<bool>, ClientError> {
        self.read(BitArea::Coils, start, count)
    }

    fn write_coil(&mut self, address: u16, value: bool) -> Result<(), ClientError> {
        let mut state = self.state.borrow_mut();
        state.requests.push(Request::WriteCoil { address, value });
        if let Some(&fault) = state.coil_write_faults.get(&address) {
            return Err(fault.to_error());
        }
        store(&mut state.coils, usize::from(address), value);
        Ok(())
    }

    fn write_coils(&mut self, start: u16, values: &[bool]) -> Result<(), ClientError> {
        let mut state = self.state.borrow_mut();
        state.requests.push(Request::WriteCoils {
            start,
            values: values.to_vec(),
        });
        if let Some(fault) = state.bulk_write_fault {
            return Err(fault.to_error());
        }
        for (offset, value) in values.iter().enumerate() {
            store(&mut state.coils, usize::from(start) + offset, *value);
        }
        Ok(())
    }

    fn close(self) {
        self.state.borrow_mut().requests.push(Request::Close);
    }
}

/// Context with the fields used across the engine tests.
///
/// `A`/`B` follow the naming of the end-to-end scenario; `lamp` and `pump`
/// come from the macro-style lowercase identifiers.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TestContext {
    pub a: bool,
    pub b: bool,
    pub lamp: bool,
    pub pump: bool,
}

impl crate::ControlContext for TestContext {
    fn fields() -> &'static [crate::BoolField<Self>] {
        use crate::BoolField;
        const FIELDS: &[BoolField<TestContext>] = &[
            BoolField::new("A", |c: &TestContext| c.a, |c: &mut TestContext, v: bool| c.a = v),
            BoolField::new("B", |c: &TestContext| c.b, |c: &mut TestContext, v: bool| c.b = v),
            BoolField::new(
                "lamp",
                |c: &TestContext| c.lamp,
                |c: &mut TestContext, v: bool| c.lamp = v,
            ),
            BoolField::new(
                "pump",
                |c: &TestContext| c.pump,
                |c: &mut TestContext, v: bool| c.pump = v,
            ),
        ];
        FIELDS
    }
}

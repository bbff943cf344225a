//! Scripted in-memory transport used by the unit tests.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use super::client::{Connector, ModbusClientTrait};
use crate::utils::error::ModbusError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    DiscreteInputs,
    Coils,
    InputRegisters,
    HoldingRegisters,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    SetUnit(u8),
    Read { table: Table, address: u16, count: u16 },
    WriteCoil { address: u16, value: bool },
    WriteRegister { address: u16, value: u16 },
}

#[derive(Debug, Clone)]
enum Reply {
    Bits(Vec<bool>),
    Words(Vec<u16>),
    Fail(ModbusError),
}

#[derive(Default)]
struct State {
    calls: Vec<Call>,
    replies: HashMap<(Table, u16), VecDeque<Reply>>,
    write_failure: Option<ModbusError>,
    connect_failures: usize,
    connects: usize,
}

/// Handle shared between a test and the clients it hands out.
///
/// Scripted replies are consumed in order; the last one repeats. Unscripted
/// reads answer with zeroes.
#[derive(Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<State>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn client(&self) -> MockClient {
        MockClient {
            state: Arc::clone(&self.state),
        }
    }

    pub fn connector(&self) -> MockConnector {
        MockConnector {
            transport: self.clone(),
        }
    }

    pub fn reply_bits(&self, table: Table, address: u16, bits: Vec<bool>) {
        self.push(table, address, Reply::Bits(bits));
    }

    pub fn reply_words(&self, table: Table, address: u16, words: Vec<u16>) {
        self.push(table, address, Reply::Words(words));
    }

    pub fn reply_error(&self, table: Table, address: u16, err: ModbusError) {
        self.push(table, address, Reply::Fail(err));
    }

    pub fn fail_writes(&self, err: ModbusError) {
        self.state.lock().unwrap().write_failure = Some(err);
    }

    pub fn fail_next_connects(&self, count: usize) {
        self.state.lock().unwrap().connect_failures = count;
    }

    pub fn connects(&self) -> usize {
        self.state.lock().unwrap().connects
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    fn push(&self, table: Table, address: u16, reply: Reply) {
        self.state
            .lock()
            .unwrap()
            .replies
            .entry((table, address))
            .or_default()
            .push_back(reply);
    }
}

pub struct MockClient {
    state: Arc<Mutex<State>>,
}

impl MockClient {
    fn next_reply(&self, table: Table, address: u16, count: u16) -> Option<Reply> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Read { table, address, count });
        let queue = state.replies.get_mut(&(table, address))?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }

    fn read_bits(&self, table: Table, address: u16, count: u16) -> Result<Vec<bool>, ModbusError> {
        match self.next_reply(table, address, count) {
            Some(Reply::Bits(bits)) => Ok(bits),
            Some(Reply::Words(words)) => Ok(words.into_iter().map(|w| w != 0).collect()),
            Some(Reply::Fail(err)) => Err(err),
            None => Ok(vec![false; count as usize]),
        }
    }

    fn read_words(&self, table: Table, address: u16, count: u16) -> Result<Vec<u16>, ModbusError> {
        match self.next_reply(table, address, count) {
            Some(Reply::Words(words)) => Ok(words),
            Some(Reply::Bits(bits)) => Ok(bits.into_iter().map(u16::from).collect()),
            Some(Reply::Fail(err)) => Err(err),
            None => Ok(vec![0; count as usize]),
        }
    }

    fn record_write(&self, call: Call) -> Result<(), ModbusError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(call);
        match &state.write_failure {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ModbusClientTrait for MockClient {
    fn set_unit_address(&mut self, unit: u8) {
        self.state.lock().unwrap().calls.push(Call::SetUnit(unit));
    }

    async fn read_discrete_inputs(&mut self, address: u16, count: u16) -> Result<Vec<bool>, ModbusError> {
        self.read_bits(Table::DiscreteInputs, address, count)
    }

    async fn read_coils(&mut self, address: u16, count: u16) -> Result<Vec<bool>, ModbusError> {
        self.read_bits(Table::Coils, address, count)
    }

    async fn write_coil(&mut self, address: u16, value: bool) -> Result<(), ModbusError> {
        self.record_write(Call::WriteCoil { address, value })
    }

    async fn read_input_registers(&mut self, address: u16, count: u16) -> Result<Vec<u16>, ModbusError> {
        self.read_words(Table::InputRegisters, address, count)
    }

    async fn read_holding_registers(&mut self, address: u16, count: u16) -> Result<Vec<u16>, ModbusError> {
        self.read_words(Table::HoldingRegisters, address, count)
    }

    async fn write_register(&mut self, address: u16, value: u16) -> Result<(), ModbusError> {
        self.record_write(Call::WriteRegister { address, value })
    }
}

pub struct MockConnector {
    transport: MockTransport,
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(&self) -> Result<Box<dyn ModbusClientTrait>, ModbusError> {
        {
            let mut state = self.transport.state.lock().unwrap();
            if state.connect_failures > 0 {
                state.connect_failures -= 1;
                return Err(ModbusError::ConnectionError("simulated connect failure".to_string()));
            }
            state.connects += 1;
        }
        Ok(Box::new(self.transport.client()))
    }

    fn describe(&self) -> String {
        "mock".to_string()
    }
}

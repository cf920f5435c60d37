use log::Level;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use crate::config::ProtocolConfig;
use crate::constants::{
    ANTENNA_POWER_OFF, ANTENNA_POWER_ON, CurrentSystem, HeartbeatMode, INVENTORY_OFF, INVENTORY_ON,
    ReaderState, StatusCode, antenna, common, control, gpio, rf, tag_functions,
};
use crate::error::{ReaderError, Result};
use crate::events::{InterruptListener, NoopListener};
use crate::frame::{FrameParser, create_command, message_id};
use crate::queue::MessageQueue;
use crate::trace::{LogTrace, TraceSink};
use crate::transport::RfidTransport;
use crate::types::{
    AntennaSlot, Attenuation, FrequencyTable, GpioCaps, LbtParams, MemoryBank, ReaderInfo,
    Sensitivity,
};

/// Protocol engine for readers speaking the `RFE` framed protocol.
///
/// Commands may be issued from any thread; each blocks until the matching
/// response is delivered through [`handle_received`](Self::handle_received)
/// or its timeout expires. Responses are keyed by command, so two concurrent
/// calls of the same command can receive each other's answer. Serialize them.
pub struct ProtocolHandler<T: RfidTransport> {
    transport: Mutex<T>,
    pub(crate) parser: Mutex<FrameParser>,
    pub(crate) responses: MessageQueue<u16>,
    pub(crate) pending: MessageQueue<u8>,
    last_return_code: AtomicU8,
    pub(crate) block_cyclic: AtomicBool,
    pub(crate) listener: Box<dyn InterruptListener>,
    trace: Arc<dyn TraceSink>,
    config: ProtocolConfig,
}

impl<T: RfidTransport> ProtocolHandler<T> {
    /// Create a handler with default timeouts, no event listener and trace
    /// output through the `log` crate.
    pub fn new(transport: T) -> Self {
        let config = ProtocolConfig::default();
        let trace = Arc::new(LogTrace::new(config.trace_target.clone()));
        Self::with_config(transport, config, Box::new(NoopListener), trace)
    }

    pub fn with_config(
        transport: T,
        config: ProtocolConfig,
        listener: Box<dyn InterruptListener>,
        trace: Arc<dyn TraceSink>,
    ) -> Self {
        Self {
            transport: Mutex::new(transport),
            parser: Mutex::new(FrameParser::new()),
            responses: MessageQueue::new(),
            pending: MessageQueue::new(),
            last_return_code: AtomicU8::new(StatusCode::Success.as_u8()),
            block_cyclic: AtomicBool::new(false),
            listener,
            trace,
            config,
        }
    }

    pub fn config(&self) -> &ProtocolConfig {
        &self.config
    }

    /// Status byte of the last command the reader rejected.
    ///
    /// Reset to `Success` when a command starts. Timeouts and send failures
    /// leave it at `Success`.
    pub fn last_return_code(&self) -> StatusCode {
        StatusCode::from_u8(self.last_return_code.load(Ordering::SeqCst))
    }

    /// Suppress delivery of cyclic inventory events while `block` is set.
    pub fn set_block_cyclic_inventory_interrupts(&self, block: bool) {
        self.block_cyclic.store(block, Ordering::Relaxed);
    }

    pub fn block_cyclic_inventory_interrupts(&self) -> bool {
        self.block_cyclic.load(Ordering::Relaxed)
    }

    // ========================================================================
    // Reader-Common
    // ========================================================================

    pub fn get_reader_id(&self) -> Result<u32> {
        self.read_u32_register("get_reader_id", common::GET_SERIAL_NUMBER)
    }

    pub fn get_reader_type(&self) -> Result<u32> {
        self.read_u32_register("get_reader_type", common::GET_READER_TYPE)
    }

    pub fn get_hardware_revision(&self) -> Result<u32> {
        self.read_u32_register("get_hardware_revision", common::GET_HARDWARE_REVISION)
    }

    pub fn get_software_revision(&self) -> Result<u32> {
        self.read_u32_register("get_software_revision", common::GET_SOFTWARE_REVISION)
    }

    pub fn get_bootloader_revision(&self) -> Result<u32> {
        self.read_u32_register("get_bootloader_revision", common::GET_BOOTLOADER_REVISION)
    }

    pub fn get_current_system(&self) -> Result<CurrentSystem> {
        let name = "get_current_system";
        let response = self.transceive(name, common::GROUP, common::GET_CURRENT_SYSTEM, &[], 1)?;
        let [system] = self.exact::<1>(name, &response)?;
        Ok(CurrentSystem::from_u8(system))
    }

    pub fn get_current_state(&self) -> Result<ReaderState> {
        let name = "get_current_state";
        let response = self.transceive(name, common::GROUP, common::GET_CURRENT_STATE, &[], 1)?;
        let [state] = self.exact::<1>(name, &response)?;
        Ok(ReaderState::from_u8(state))
    }

    pub fn get_status_register(&self) -> Result<u64> {
        let name = "get_status_register";
        let response = self.transceive(name, common::GROUP, common::GET_STATUS_REGISTER, &[], 1)?;
        Ok(u64::from_be_bytes(self.exact::<8>(name, &response)?))
    }

    pub fn get_antenna_count(&self) -> Result<u8> {
        let name = "get_antenna_count";
        let response = self.transceive(name, common::GROUP, common::GET_ANTENNA_COUNT, &[], 1)?;
        let [count] = self.exact::<1>(name, &response)?;
        Ok(count)
    }

    /// Read every identification register in turn, stopping at the first
    /// failure.
    pub fn reader_info(&self) -> Result<ReaderInfo> {
        let info = ReaderInfo {
            reader_id: self.get_reader_id()?,
            reader_type: self.get_reader_type()?,
            hardware_revision: self.get_hardware_revision()?,
            software_revision: self.get_software_revision()?,
            bootloader_revision: self.get_bootloader_revision()?,
            current_system: self.get_current_system()?,
            current_state: self.get_current_state()?,
            status_register: self.get_status_register()?,
        };
        self.trace(
            Level::Info,
            format_args!(
                "reader 0x{:08X} type 0x{:08X} hw 0x{:08X} sw 0x{:08X} bl 0x{:08X}",
                info.reader_id,
                info.reader_type,
                info.hardware_revision,
                info.software_revision,
                info.bootloader_revision
            ),
        );
        Ok(info)
    }

    // ========================================================================
    // Reader-RF
    // ========================================================================

    pub fn get_attenuation(&self) -> Result<Attenuation> {
        let name = "get_attenuation";
        let response = self.status_command(name, rf::GROUP, rf::GET_ATTENUATION, &[], 1)?;
        let [_, max_hi, max_lo, cur_hi, cur_lo] = self.exact::<5>(name, &response)?;
        Ok(Attenuation {
            max: u16::from_be_bytes([max_hi, max_lo]),
            current: u16::from_be_bytes([cur_hi, cur_lo]),
        })
    }

    /// Read the frequency hopping table. Frequencies are 24-bit values in kHz.
    pub fn get_frequency(&self) -> Result<FrequencyTable> {
        let name = "get_frequency";
        let response = self.status_command(name, rf::GROUP, rf::GET_FREQUENCY, &[], 1)?;
        if response.len() < 5 {
            return Err(self.invalid(name, format_args!("{} bytes", response.len())));
        }
        let count = response[3] as usize;
        let table = &response[4..];
        if table.len() < count * 3 {
            return Err(self.invalid(
                name,
                format_args!("{} frequencies announced, {} bytes present", count, table.len()),
            ));
        }
        let frequencies = table
            .chunks_exact(3)
            .take(count)
            .map(|f| u32::from_be_bytes([0, f[0], f[1], f[2]]))
            .collect();
        Ok(FrequencyTable {
            mode: response[1],
            max_count: response[2],
            frequencies,
        })
    }

    pub fn get_sensitivity(&self) -> Result<Sensitivity> {
        let name = "get_sensitivity";
        let response = self.status_command(name, rf::GROUP, rf::GET_SENSITIVITY, &[], 1)?;
        let [_, max_hi, max_lo, min_hi, min_lo, cur_hi, cur_lo] = self.exact::<7>(name, &response)?;
        Ok(Sensitivity {
            max: i16::from_be_bytes([max_hi, max_lo]),
            min: i16::from_be_bytes([min_hi, min_lo]),
            current: i16::from_be_bytes([cur_hi, cur_lo]),
        })
    }

    pub fn get_lbt_params(&self) -> Result<LbtParams> {
        let name = "get_lbt_params";
        let response = self.status_command(name, rf::GROUP, rf::GET_LBT_PARAMS, &[], 1)?;
        let p = self.exact::<9>(name, &response)?;
        Ok(LbtParams {
            listen_time: u16::from_be_bytes([p[1], p[2]]),
            idle_time: u16::from_be_bytes([p[3], p[4]]),
            max_alloc_time: u16::from_be_bytes([p[5], p[6]]),
            rssi_threshold: i16::from_be_bytes([p[7], p[8]]),
        })
    }

    pub fn set_attenuation(&self, value: u16) -> Result<()> {
        self.status_command(
            "set_attenuation",
            rf::GROUP,
            rf::SET_ATTENUATION,
            &value.to_be_bytes(),
            1,
        )
        .map(drop)
    }

    /// Replace the frequency hopping table. Each frequency must fit in 24 bits.
    pub fn set_frequency(&self, mode: u8, frequencies: &[u32]) -> Result<()> {
        let count = u8::try_from(frequencies.len()).map_err(|_| {
            ReaderError::InvalidParameter(format!("{} frequencies exceed 255", frequencies.len()))
        })?;
        let mut payload = Vec::with_capacity(2 + frequencies.len() * 3);
        payload.push(mode);
        payload.push(count);
        for &frequency in frequencies {
            if frequency > 0x00FF_FFFF {
                return Err(ReaderError::InvalidParameter(format!(
                    "frequency {} does not fit in 24 bits",
                    frequency
                )));
            }
            payload.extend_from_slice(&frequency.to_be_bytes()[1..]);
        }
        self.status_command("set_frequency", rf::GROUP, rf::SET_FREQUENCY, &payload, 1)
            .map(drop)
    }

    /// Request a sensitivity; returns the value the reader actually applied.
    pub fn set_sensitivity(&self, value: i16) -> Result<i16> {
        let name = "set_sensitivity";
        let response =
            self.status_command(name, rf::GROUP, rf::SET_SENSITIVITY, &value.to_be_bytes(), 1)?;
        match response.get(1..3) {
            Some(&[hi, lo]) => Ok(i16::from_be_bytes([hi, lo])),
            _ => Err(self.invalid(name, format_args!("{} bytes", response.len()))),
        }
    }

    pub fn set_lbt_params(&self, params: &LbtParams) -> Result<()> {
        self.status_command("set_lbt_params", rf::GROUP, rf::SET_LBT_PARAMS, &params.to_bytes(), 1)
            .map(drop)
    }

    // ========================================================================
    // Reader-Control
    // ========================================================================

    /// Ask the reader to reboot. The reader does not answer this command.
    pub fn reboot(&self) -> Result<()> {
        self.reset_return_code();
        self.trace(Level::Debug, format_args!("reboot - sending"));
        self.send(control::GROUP, control::REBOOT, &[])
    }

    /// Enable or disable the heartbeat interrupt. An `interval_ms` of 0 keeps
    /// the reader's current interval.
    pub fn set_heartbeat(&self, on: bool, interval_ms: u16) -> Result<()> {
        let mode = if on { HeartbeatMode::On } else { HeartbeatMode::Off };
        let mut payload = vec![mode as u8];
        if interval_ms != 0 {
            payload.extend_from_slice(&interval_ms.to_be_bytes());
        }
        self.status_command("set_heartbeat", control::GROUP, control::SET_HEARTBEAT, &payload, 1)
            .map(drop)
    }

    pub fn set_antenna_power(&self, on: bool) -> Result<()> {
        let value = if on { ANTENNA_POWER_ON } else { ANTENNA_POWER_OFF };
        self.status_command(
            "set_antenna_power",
            control::GROUP,
            control::SET_ANTENNA_POWER,
            &[value],
            1,
        )
        .map(drop)
    }

    pub fn save_settings_permanent(&self) -> Result<()> {
        self.status_command(
            "save_settings_permanent",
            control::GROUP,
            control::SAVE_SETTINGS_PERMANENT,
            &[],
            1,
        )
        .map(drop)
    }

    pub fn restore_factory_settings(&self) -> Result<()> {
        self.status_command(
            "restore_factory_settings",
            control::GROUP,
            control::RESTORE_FACTORY_SETTINGS,
            &[],
            1,
        )
        .map(drop)
    }

    /// Read a configuration parameter by address.
    pub fn get_param(&self, address: u16) -> Result<Vec<u8>> {
        let name = "get_param";
        let response = self.status_command(
            name,
            control::GROUP,
            control::GET_PARAM,
            &address.to_be_bytes(),
            1,
        )?;
        self.length_prefixed(name, &response)
    }

    pub fn set_param(&self, address: u16, value: &[u8]) -> Result<()> {
        let len = u8::try_from(value.len()).map_err(|_| {
            ReaderError::InvalidParameter(format!("parameter value of {} bytes", value.len()))
        })?;
        let mut payload = Vec::with_capacity(3 + value.len());
        payload.extend_from_slice(&address.to_be_bytes());
        payload.push(len);
        payload.extend_from_slice(value);
        self.status_command("set_param", control::GROUP, control::SET_PARAM, &payload, 1)
            .map(drop)
    }

    pub fn get_device_name(&self) -> Result<String> {
        self.get_text("get_device_name", control::GET_DEVICE_NAME)
    }

    pub fn set_device_name(&self, name: &str) -> Result<()> {
        self.set_text("set_device_name", control::SET_DEVICE_NAME, name)
    }

    pub fn get_device_location(&self) -> Result<String> {
        self.get_text("get_device_location", control::GET_DEVICE_LOCATION)
    }

    pub fn set_device_location(&self, location: &str) -> Result<()> {
        self.set_text("set_device_location", control::SET_DEVICE_LOCATION, location)
    }

    // ========================================================================
    // GPIO
    // ========================================================================

    pub fn get_gpio_caps(&self) -> Result<GpioCaps> {
        let name = "get_gpio_caps";
        let response = self.transceive(name, gpio::GROUP, gpio::GET_GPIO_CAPS, &[], 1)?;
        let p = self.exact::<12>(name, &response)?;
        Ok(GpioCaps {
            mask: u32::from_be_bytes([p[0], p[1], p[2], p[3]]),
            output: u32::from_be_bytes([p[4], p[5], p[6], p[7]]),
            input: u32::from_be_bytes([p[8], p[9], p[10], p[11]]),
        })
    }

    /// Direction bit mask, 1 = output.
    pub fn get_gpio_direction(&self) -> Result<u32> {
        let name = "get_gpio_direction";
        let response = self.transceive(name, gpio::GROUP, gpio::GET_GPIO_DIRECTION, &[], 1)?;
        Ok(u32::from_be_bytes(self.exact::<4>(name, &response)?))
    }

    pub fn set_gpio_direction(&self, direction: u32) -> Result<()> {
        self.status_command(
            "set_gpio_direction",
            gpio::GROUP,
            gpio::SET_GPIO_DIRECTION,
            &direction.to_be_bytes(),
            1,
        )
        .map(drop)
    }

    pub fn get_gpio(&self) -> Result<u32> {
        let name = "get_gpio";
        let response = self.transceive(name, gpio::GROUP, gpio::GET_GPIO, &[], 1)?;
        Ok(u32::from_be_bytes(self.exact::<4>(name, &response)?))
    }

    pub fn set_gpio(&self, mask: u32) -> Result<()> {
        self.status_command("set_gpio", gpio::GROUP, gpio::SET_GPIO, &mask.to_be_bytes(), 1)
            .map(drop)
    }

    pub fn clear_gpio(&self, mask: u32) -> Result<()> {
        self.status_command("clear_gpio", gpio::GROUP, gpio::CLEAR_GPIO, &mask.to_be_bytes(), 1)
            .map(drop)
    }

    /// Clear the pins in `clear_mask`, then set the pins in `set_mask`.
    pub fn clear_set_gpio(&self, clear_mask: u32, set_mask: u32) -> Result<()> {
        let mut payload = [0u8; 8];
        payload[..4].copy_from_slice(&clear_mask.to_be_bytes());
        payload[4..].copy_from_slice(&set_mask.to_be_bytes());
        self.status_command("clear_set_gpio", gpio::GROUP, gpio::CLEAR_SET_GPIO, &payload, 1)
            .map(drop)
    }

    // ========================================================================
    // Antenna
    // ========================================================================

    pub fn set_antenna_sequence(&self, sequence: &[AntennaSlot]) -> Result<()> {
        let count = u8::try_from(sequence.len()).map_err(|_| {
            ReaderError::InvalidParameter(format!("{} antenna slots exceed 255", sequence.len()))
        })?;
        let mut payload = Vec::with_capacity(1 + sequence.len() * 5);
        payload.push(count);
        for slot in sequence {
            payload.push(slot.index);
            payload.extend_from_slice(&slot.time.to_be_bytes());
        }
        self.status_command(
            "set_antenna_sequence",
            antenna::GROUP,
            antenna::SET_ANTENNA_SEQUENCE,
            &payload,
            1,
        )
        .map(drop)
    }

    pub fn get_antenna_sequence(&self) -> Result<Vec<AntennaSlot>> {
        let name = "get_antenna_sequence";
        let response =
            self.status_command(name, antenna::GROUP, antenna::GET_ANTENNA_SEQUENCE, &[], 1)?;
        let Some(&count) = response.get(1) else {
            return Err(self.invalid(name, format_args!("{} bytes", response.len())));
        };
        if response.len() != count as usize * 5 + 2 {
            return Err(self.invalid(
                name,
                format_args!("{} slots announced, {} bytes present", count, response.len()),
            ));
        }
        Ok(response[2..]
            .chunks_exact(5)
            .map(|s| AntennaSlot {
                index: s[0],
                time: u32::from_be_bytes([s[1], s[2], s[3], s[4]]),
            })
            .collect())
    }

    pub fn set_working_antenna(&self, index: u8) -> Result<()> {
        self.status_command(
            "set_working_antenna",
            antenna::GROUP,
            antenna::SET_WORKING_ANTENNA,
            &[index],
            1,
        )
        .map(drop)
    }

    pub fn get_working_antenna(&self) -> Result<u8> {
        let name = "get_working_antenna";
        let response =
            self.status_command(name, antenna::GROUP, antenna::GET_WORKING_ANTENNA, &[], 1)?;
        response
            .get(1)
            .copied()
            .ok_or_else(|| self.invalid(name, format_args!("{} bytes", response.len())))
    }

    // ========================================================================
    // Tag functions
    // ========================================================================

    /// Run one inventory round and return the EPC of every tag seen.
    pub fn do_single_inventory(&self) -> Result<Vec<Vec<u8>>> {
        let name = "do_single_inventory";
        let response = self.status_command(
            name,
            tag_functions::GROUP,
            tag_functions::INVENTORY_SINGLE,
            &[],
            1,
        )?;
        let Some(&count) = response.get(2) else {
            return Err(self.invalid(name, format_args!("{} bytes", response.len())));
        };

        // each entry: [entry length, .., epc length, epc..]
        let mut epcs = Vec::with_capacity(count as usize);
        let mut index = 3;
        for _ in 0..count {
            let epc = response
                .get(index + 2)
                .map(|&len| index + 3..index + 3 + len as usize)
                .and_then(|range| response.get(range))
                .ok_or_else(|| self.invalid(name, format_args!("truncated entry at {}", index)))?;
            epcs.push(epc.to_vec());
            index += response[index] as usize + 1;
        }
        Ok(epcs)
    }

    pub fn set_cyclic_inventory(&self, on: bool) -> Result<()> {
        let value = if on { INVENTORY_ON } else { INVENTORY_OFF };
        self.status_command(
            "set_cyclic_inventory",
            tag_functions::GROUP,
            tag_functions::INVENTORY_CYCLIC,
            &[value],
            1,
        )
        .map(drop)
    }

    /// Read `count` bytes from the tag with the given EPC, starting at the
    /// word address `address`.
    ///
    /// The reader may defer the result; in that case the call keeps waiting
    /// for the matching operation-result interrupt.
    pub fn read_from_tag(
        &self,
        epc: &[u8],
        bank: MemoryBank,
        address: u16,
        password: &[u8; 4],
        count: u8,
    ) -> Result<Vec<u8>> {
        let name = "read_from_tag";
        let mut payload = Self::epc_prefix(epc)?;
        payload.push(bank as u8);
        payload.extend_from_slice(&address.to_be_bytes());
        payload.extend_from_slice(password);
        payload.push(count);

        let response = self.transceive(
            name,
            tag_functions::GROUP,
            tag_functions::READ_FROM_TAG,
            &payload,
            4,
        )?;
        let Some(&code) = response.first() else {
            return Err(self.invalid(name, format_args!("empty payload")));
        };

        match StatusCode::from_u8(code) {
            StatusCode::Success => self.length_prefixed(name, &response),
            StatusCode::ResultPending => {
                if response.len() != 2 {
                    self.last_return_code.store(code, Ordering::SeqCst);
                    return Err(self.invalid(
                        name,
                        format_args!("pending response of {} bytes", response.len()),
                    ));
                }
                let pending_id = response[1];
                self.trace(Level::Debug, format_args!("{} - pending id {}", name, pending_id));
                let timeout = self.config.scaled_timeout(10);
                let Some(result) = self.pending.wait_for(pending_id, timeout) else {
                    self.trace(Level::Warn, format_args!("{} - NOK - no pending result", name));
                    return Err(ReaderError::Timeout(format!(
                        "{} pending result {}",
                        name, pending_id
                    )));
                };
                self.check_status(name, &result)?;
                self.length_prefixed(name, &result)
            }
            status => {
                self.last_return_code.store(code, Ordering::SeqCst);
                self.trace(Level::Warn, format_args!("{} - NOK - {}", name, status));
                Err(ReaderError::Status(status))
            }
        }
    }

    pub fn write_to_tag(
        &self,
        epc: &[u8],
        bank: MemoryBank,
        address: u16,
        password: &[u8; 4],
        data: &[u8],
    ) -> Result<()> {
        let len = u8::try_from(data.len())
            .map_err(|_| ReaderError::InvalidParameter(format!("{} bytes to write", data.len())))?;
        let mut payload = Self::epc_prefix(epc)?;
        payload.push(bank as u8);
        payload.extend_from_slice(&address.to_be_bytes());
        payload.extend_from_slice(password);
        payload.push(len);
        payload.extend_from_slice(data);
        self.status_command(
            "write_to_tag",
            tag_functions::GROUP,
            tag_functions::WRITE_TO_TAG,
            &payload,
            4,
        )
        .map(drop)
    }

    pub fn lock_tag(&self, epc: &[u8], mode: u8, memory: u8, password: &[u8; 4]) -> Result<()> {
        let mut payload = Self::epc_prefix(epc)?;
        payload.push(mode);
        payload.push(memory);
        payload.extend_from_slice(password);
        self.status_command("lock_tag", tag_functions::GROUP, tag_functions::LOCK_TAG, &payload, 2)
            .map(drop)
    }

    /// Kill a tag. `rfu` and `recom` are 4-bit fields.
    pub fn kill_tag(&self, epc: &[u8], rfu: u8, recom: u8, password: &[u8; 4]) -> Result<()> {
        let mut payload = Self::epc_prefix(epc)?;
        payload.push(((rfu & 0x0F) << 4) | (recom & 0x0F));
        payload.extend_from_slice(password);
        self.status_command("kill_tag", tag_functions::GROUP, tag_functions::KILL_TAG, &payload, 2)
            .map(drop)
    }

    /// Run a vendor-specific tag command. Returns the response after its
    /// status byte.
    pub fn custom_tag_command(&self, command_id: u8, data: &[u8]) -> Result<Vec<u8>> {
        let mut payload = Vec::with_capacity(1 + data.len());
        payload.push(command_id);
        payload.extend_from_slice(data);
        let response = self.status_command(
            "custom_tag_command",
            tag_functions::GROUP,
            tag_functions::CUSTOM_TAG_COMMAND,
            &payload,
            2,
        )?;
        Ok(response[1..].to_vec())
    }

    pub fn acknowledge_tag(&self, tag_id: &[u8]) -> Result<()> {
        let payload = Self::epc_prefix(tag_id)?;
        self.custom_tag_command(tag_functions::CUSTOM_ACKNOWLEDGE_TAG, &payload)
            .map(drop)
    }

    /// Read from a tag addressed by its Gen2 handle instead of its EPC.
    pub fn read_from_handle(
        &self,
        handle: [u8; 2],
        bank: MemoryBank,
        address: u16,
        password: &[u8; 4],
        count: u8,
    ) -> Result<Vec<u8>> {
        let mut payload = Vec::with_capacity(10);
        payload.extend_from_slice(&handle);
        payload.push(bank as u8);
        payload.extend_from_slice(&address.to_be_bytes());
        payload.extend_from_slice(password);
        payload.push(count);
        let result = self.custom_tag_command(tag_functions::CUSTOM_READ_FROM_HANDLE, &payload)?;
        match result.split_first() {
            Some((_, data)) => Ok(data.to_vec()),
            None => Err(self.invalid("read_from_handle", format_args!("empty result"))),
        }
    }

    // ========================================================================
    // Plumbing
    // ========================================================================

    pub(crate) fn trace(&self, level: Level, message: fmt::Arguments<'_>) {
        self.trace.record(level, message);
    }

    /// Read whatever the transport has buffered, waiting at most one receive
    /// poll interval.
    pub(crate) fn read_transport(&self, buf: &mut [u8]) -> Result<usize> {
        let timeout_ms = u32::try_from(self.config.receive_poll.as_millis()).unwrap_or(u32::MAX);
        self.transport
            .lock()
            .read(buf, timeout_ms)
            .map_err(|e| ReaderError::Transport(format!("{:?}", e)))
    }

    /// Discard bytes buffered by the transport and any partial frame.
    pub fn clear_input(&self) -> Result<()> {
        self.transport
            .lock()
            .clear_input()
            .map_err(|e| ReaderError::Transport(format!("{:?}", e)))?;
        *self.parser.lock() = FrameParser::new();
        Ok(())
    }

    fn reset_return_code(&self) {
        self.last_return_code.store(StatusCode::Success.as_u8(), Ordering::SeqCst);
    }

    fn send(&self, group: u8, command: u8, payload: &[u8]) -> Result<()> {
        if payload.len() > u8::MAX as usize {
            return Err(ReaderError::InvalidParameter(format!(
                "payload of {} bytes does not fit in one frame",
                payload.len()
            )));
        }
        let frame = create_command(group, command, payload);
        self.trace(Level::Trace, format_args!("-> {:02X?}", frame));
        self.transport
            .lock()
            .write(&frame)
            .map_err(|e| ReaderError::Transport(format!("{:?}", e)))?;
        Ok(())
    }

    /// Send a request and wait for the frame with the same group and command.
    fn transceive(
        &self,
        name: &str,
        group: u8,
        command: u8,
        payload: &[u8],
        timeout_factor: u32,
    ) -> Result<Vec<u8>> {
        self.reset_return_code();
        self.trace(Level::Debug, format_args!("{} - sending", name));
        if let Err(e) = self.send(group, command, payload) {
            self.trace(Level::Warn, format_args!("{} - NOK - send: {}", name, e));
            return Err(e);
        }

        let timeout = self.config.scaled_timeout(timeout_factor);
        match self.responses.wait_for(message_id(group, command), timeout) {
            Some(response) => {
                self.trace(Level::Debug, format_args!("{} - response {:02X?}", name, response));
                Ok(response)
            }
            None => {
                self.trace(
                    Level::Warn,
                    format_args!("{} - NOK - no response in {:?}", name, timeout),
                );
                Err(ReaderError::Timeout(name.to_string()))
            }
        }
    }

    fn status_command(
        &self,
        name: &str,
        group: u8,
        command: u8,
        payload: &[u8],
        timeout_factor: u32,
    ) -> Result<Vec<u8>> {
        let response = self.transceive(name, group, command, payload, timeout_factor)?;
        self.check_status(name, &response)?;
        Ok(response)
    }

    fn check_status(&self, name: &str, response: &[u8]) -> Result<()> {
        let Some(&code) = response.first() else {
            return Err(self.invalid(name, format_args!("empty payload")));
        };
        let status = StatusCode::from_u8(code);
        if status != StatusCode::Success {
            self.last_return_code.store(code, Ordering::SeqCst);
            self.trace(Level::Warn, format_args!("{} - NOK - {}", name, status));
            return Err(ReaderError::Status(status));
        }
        Ok(())
    }

    fn invalid(&self, name: &str, detail: fmt::Arguments<'_>) -> ReaderError {
        self.trace(Level::Warn, format_args!("{} - NOK - {}", name, detail));
        ReaderError::InvalidResponse(format!("{}: {}", name, detail))
    }

    fn exact<const N: usize>(&self, name: &str, response: &[u8]) -> Result<[u8; N]> {
        <[u8; N]>::try_from(response).map_err(|_| {
            self.invalid(name, format_args!("expected {} bytes, got {}", N, response.len()))
        })
    }

    fn read_u32_register(&self, name: &str, command: u8) -> Result<u32> {
        let response = self.transceive(name, common::GROUP, command, &[], 1)?;
        Ok(u32::from_be_bytes(self.exact::<4>(name, &response)?))
    }

    /// `[status, len, data..]` to `data`
    fn length_prefixed(&self, name: &str, response: &[u8]) -> Result<Vec<u8>> {
        response
            .get(1)
            .and_then(|&len| response.get(2..2 + len as usize))
            .map(<[u8]>::to_vec)
            .ok_or_else(|| {
                self.invalid(name, format_args!("truncated data in {} bytes", response.len()))
            })
    }

    fn get_text(&self, name: &str, command: u8) -> Result<String> {
        let response = self.status_command(name, control::GROUP, command, &[], 1)?;
        let text = &response[1..];
        if !text.is_ascii() {
            return Err(self.invalid(name, format_args!("non-ASCII text {:02X?}", text)));
        }
        Ok(text.iter().map(|&b| b as char).collect())
    }

    fn set_text(&self, name: &str, command: u8, text: &str) -> Result<()> {
        if !text.is_ascii() {
            return Err(ReaderError::InvalidParameter(format!("{:?} is not ASCII", text)));
        }
        self.status_command(name, control::GROUP, command, text.as_bytes(), 1)
            .map(drop)
    }

    fn epc_prefix(epc: &[u8]) -> Result<Vec<u8>> {
        let len = u8::try_from(epc.len())
            .map_err(|_| ReaderError::InvalidParameter(format!("EPC of {} bytes", epc.len())))?;
        let mut payload = Vec::with_capacity(16 + epc.len());
        payload.push(len);
        payload.extend_from_slice(epc);
        Ok(payload)
    }
}

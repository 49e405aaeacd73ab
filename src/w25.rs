//! Driver for Winbond W25X/W25Q serial flash chips.
//!
//! [`Flash`] owns the bus [`Transport`] to one chip plus a [`Monotonic`]
//! clock and turns byte-level operations into the chip's command frames.
//! Bounds and alignment checks, page-aware programming, sector and block
//! erasure, busy polling and the deep power-down handshake all live here.

use crate::{Error, Monotonic, Transport};
use bitflags::bitflags;
use core::convert::TryInto;

/// Bytes per program page. A page program must not cross a page boundary.
const PAGE_SIZE: usize = 256;

/// Bytes covered by one sector erase command.
const SECTOR_SIZE: u32 = 4 * 1024;

/// Bytes covered by one block erase command.
const BLOCK_SIZE: u32 = 32 * 1024;

/// Opcode plus the 3-byte big-endian address that starts a data frame.
const CMD_HEADER: usize = 4;

/// How long a busy chip is polled before [`Flash::wait`] gives up.
const WAIT_BUDGET_MS: u32 = 800;

enum Opcode {
    /// Write the 8-bit status register. Not all bits are writeable.
    WriteStatus = 0x01,
    PageProg = 0x02,
    Read = 0x03,
    /// Read the 8-bit status register.
    ReadStatus = 0x05,
    /// Set the write enable latch.
    WriteEnable = 0x06,
    /// Erase a 4 KiB sector.
    SectorErase = 0x20,
    /// Read the factory-programmed 64-bit unique ID.
    ReadUniqueId = 0x4B,
    /// Erase a 32 KiB block.
    BlockErase = 0x52,
    /// Read the JEDEC manufacturer and device IDs.
    ReadJedecId = 0x9F,
    /// Wake the chip from deep power-down.
    ReleasePowerDown = 0xAB,
    /// Enter deep power-down; the chip then ignores everything but 0xAB.
    PowerDown = 0xB9,
}

bitflags! {
    /// Status register bits.
    pub struct Status: u8 {
        /// Erase or write in progress.
        const BUSY = 1 << 0;
        /// Status of the **W**rite **E**nable **L**atch.
        const WEL = 1 << 1;
        /// **B**lock **p**rotect bit 0.
        const BP0 = 1 << 2;
        /// **B**lock **p**rotect bit 1.
        const BP1 = 1 << 3;
        /// **B**lock **p**rotect bit 2.
        const BP2 = 1 << 4;
        /// **T**op/**b**ottom protect.
        const TB = 1 << 5;
        /// **Sec**tor protect.
        const SEC = 1 << 6;
        /// **S**tatus **r**egister **p**rotect bit 0.
        const SRP = 1 << 7;
    }
}

/// Driver for a single W25-series flash chip.
///
/// Every method that reaches the chip transparently wakes it from deep
/// power-down first, so [`Flash::sleep`] never needs a matching wake call.
/// The driver assumes exclusive access to the chip: the write enable latch
/// and the power-down state are not protected against interleaved commands
/// from elsewhere.
///
/// # Type Parameters
///
/// * **`SPI`**: The bus [`Transport`] the chip is attached to.
/// * **`CLK`**: The [`Monotonic`] clock used to bound busy polling.
#[derive(Debug)]
pub struct Flash<SPI: Transport, CLK: Monotonic> {
    spi: SPI,
    clock: CLK,
    capacity: u32,
    powered_down: bool,
}

impl<SPI: Transport, CLK: Monotonic> Flash<SPI, CLK> {
    /// Creates a driver for a chip of `capacity` bytes.
    ///
    /// Configures the transport as bus master but sends nothing to the chip
    /// itself; the chip is assumed awake, as it is after power-on.
    ///
    /// # Parameters
    ///
    /// * **`spi`**: The transport the chip is wired to.
    /// * **`clock`**: Millisecond time source for busy-wait budgets.
    /// * **`capacity`**: Addressable size of the chip in bytes. All
    ///   offset/length validation is a bounds check against this value.
    pub fn init(spi: SPI, clock: CLK, capacity: u32) -> Self {
        let mut this = Self {
            spi,
            clock,
            capacity,
            powered_down: false,
        };
        this.spi.master();
        info!("Flash::init: capacity = {} bytes", this.capacity);
        this
    }

    /// Returns the chip capacity in bytes, as passed to [`Flash::init`].
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Releases the transport and clock.
    pub fn free(self) -> (SPI, CLK) {
        (self.spi, self.clock)
    }

    /// Puts the chip into deep power-down.
    ///
    /// While powered down the chip draws minimal current and answers only
    /// the release command, which the next operation sends on its own.
    /// Calling this on an already sleeping chip does nothing.
    pub fn sleep(&mut self) {
        if !self.powered_down {
            self.spi.transfer(Opcode::PowerDown as u8);
            self.powered_down = true;
            trace!("Flash: powered down");
        }
    }

    fn recover_from_power_down(&mut self) {
        if self.powered_down {
            self.spi.transfer(Opcode::ReleasePowerDown as u8);
            self.powered_down = false;
            trace!("Flash: released from power-down");
        }
    }

    /// Reads the status register.
    pub fn read_status(&mut self) -> Status {
        self.recover_from_power_down();
        let status = self.spi.transfer_register(Opcode::ReadStatus as u8, 0);
        Status::from_bits_truncate(status)
    }

    /// Writes the status register and blocks until the chip has committed
    /// it.
    ///
    /// The write enable latch is asserted first, as for any mutating
    /// command. Whether a given bit is writeable at all is the chip's
    /// concern, not checked here.
    pub fn write_status(&mut self, status: Status) -> Result<(), Error> {
        self.recover_from_power_down();
        self.write_enable();
        self.spi
            .transfer_register(Opcode::WriteStatus as u8, status.bits());
        self.wait()
    }

    fn write_enable(&mut self) {
        // The latch auto-clears after one mutating command, so it is
        // re-asserted before every such command rather than cached.
        self.spi.transfer(Opcode::WriteEnable as u8);
    }

    /// Polls the status register until the chip reports idle.
    ///
    /// Gives up with [`Error::Timeout`] once the chip has stayed busy for
    /// the whole 800 ms poll budget. A timeout means the hardware is stuck
    /// or has failed; the driver never retries on its own.
    pub fn wait(&mut self) -> Result<(), Error> {
        self.recover_from_power_down();
        let start = self.clock.now_ms();
        while self.read_status().contains(Status::BUSY) {
            if self.clock.now_ms().wrapping_sub(start) > WAIT_BUDGET_MS {
                return Err(Error::Timeout);
            }
        }
        Ok(())
    }

    /// Reads `buf.len()` bytes starting at `addr` into `buf`.
    ///
    /// Fails with [`Error::InputValue`] if the range extends past the end
    /// of the chip. Long reads are issued as a sequence of page-sized
    /// command frames.
    pub fn read(&mut self, addr: u32, buf: &mut [u8]) -> Result<(), Error> {
        self.check_range(addr, buf.len())?;
        self.recover_from_power_down();

        let mut addr = addr;
        for chunk in buf.chunks_mut(PAGE_SIZE) {
            let mut frame = [0; CMD_HEADER + PAGE_SIZE];
            let end = CMD_HEADER + chunk.len();
            frame[0] = Opcode::Read as u8;
            frame[1] = (addr >> 16) as u8;
            frame[2] = (addr >> 8) as u8;
            frame[3] = addr as u8;
            self.spi.transfer_bulk(&mut frame[..end]);
            chunk.copy_from_slice(&frame[CMD_HEADER..end]);
            addr += chunk.len() as u32;
        }
        Ok(())
    }

    /// Erases `length` bytes starting at `offset`, resetting them to
    /// `0xFF`.
    ///
    /// Both `offset` and `length` must be multiples of 4 KiB; erasure only
    /// ever covers whole sectors. A run that starts on a 32 KiB boundary
    /// and spans whole 32 KiB blocks is erased with block commands,
    /// anything else sector by sector. The first sub-erase that times out
    /// aborts the call; sectors erased before that stay erased.
    pub fn erase(&mut self, offset: u32, length: u32) -> Result<(), Error> {
        self.check_range(offset, length as usize)?;
        if offset % SECTOR_SIZE != 0 || length % SECTOR_SIZE != 0 {
            return Err(Error::InputValue);
        }
        self.recover_from_power_down();
        trace!("Flash: erasing {} bytes at {:#x}", length, offset);

        let mut offset = offset;
        let mut remaining = length;
        if offset % BLOCK_SIZE == 0 && remaining % BLOCK_SIZE == 0 {
            while remaining != 0 {
                self.erase_block(offset, 32)?;
                offset += BLOCK_SIZE;
                remaining -= BLOCK_SIZE;
            }
        }
        while remaining != 0 {
            self.erase_block(offset, 4)?;
            offset += SECTOR_SIZE;
            remaining -= SECTOR_SIZE;
        }
        Ok(())
    }

    /// Erases one hardware unit: a 4 KiB sector or a 32 KiB block.
    ///
    /// `offset` must be aligned to the unit size. Callers are expected to
    /// have woken the chip already.
    fn erase_block(&mut self, offset: u32, block_kib: u32) -> Result<(), Error> {
        let opcode = match block_kib {
            4 => Opcode::SectorErase,
            32 => Opcode::BlockErase,
            _ => return Err(Error::InputValue),
        };
        if offset % (block_kib * 1024) != 0 {
            return Err(Error::InputValue);
        }

        self.write_enable();
        let mut cmd_buf = [
            opcode as u8,
            (offset >> 16) as u8,
            (offset >> 8) as u8,
            offset as u8,
        ];
        self.spi.transfer_bulk(&mut cmd_buf);
        self.wait()
    }

    /// Programs `data` into flash starting at `addr`.
    ///
    /// The target range must already be erased: programming only clears
    /// bits towards zero. The data is split so that no single program
    /// command crosses a 256-byte page boundary, and the call returns only
    /// once the last page has physically completed. A chunk that times out
    /// aborts the remaining chunks immediately.
    pub fn write(&mut self, addr: u32, data: &[u8]) -> Result<(), Error> {
        self.check_range(addr, data.len())?;
        self.recover_from_power_down();
        trace!("Flash: writing {} bytes at {:#x}", data.len(), addr);

        let mut addr = addr;
        let mut data = data;
        while !data.is_empty() {
            let page_room = PAGE_SIZE - addr as usize % PAGE_SIZE;
            let chunk = &data[..data.len().min(page_room)];

            self.wait()?;
            self.write_enable();

            let mut frame = [0; CMD_HEADER + PAGE_SIZE];
            let end = CMD_HEADER + chunk.len();
            frame[0] = Opcode::PageProg as u8;
            frame[1] = (addr >> 16) as u8;
            frame[2] = (addr >> 8) as u8;
            frame[3] = addr as u8;
            frame[CMD_HEADER..end].copy_from_slice(chunk);
            self.spi.transfer_bulk(&mut frame[..end]);

            addr += chunk.len() as u32;
            data = &data[chunk.len()..];
        }
        self.wait()
    }

    /// Reads the JEDEC manufacturer/device identification.
    ///
    /// Packs the manufacturer ID, memory type and capacity code as
    /// `0x00MMTTCC`.
    pub fn read_jedec_id(&mut self) -> u32 {
        self.recover_from_power_down();
        let mut frame = [Opcode::ReadJedecId as u8, 0, 0, 0];
        self.spi.transfer_bulk(&mut frame);
        u32::from(frame[1]) << 16 | u32::from(frame[2]) << 8 | u32::from(frame[3])
    }

    /// Reads the factory-programmed unique ID.
    pub fn read_unique_id(&mut self) -> u64 {
        self.recover_from_power_down();
        // Opcode, 4 dummy bytes, then the 8 ID bytes.
        let mut frame = [0; 13];
        frame[0] = Opcode::ReadUniqueId as u8;
        self.spi.transfer_bulk(&mut frame);
        u64::from_be_bytes(frame[5..].try_into().unwrap())
    }

    fn check_range(&self, offset: u32, length: usize) -> Result<(), Error> {
        // u64 math so `offset + length` cannot wrap.
        if u64::from(offset) + length as u64 > u64::from(self.capacity) {
            Err(Error::InputValue)
        } else {
            Ok(())
        }
    }
}

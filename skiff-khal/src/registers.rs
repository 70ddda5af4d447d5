//! Typed access to memory-mapped system control registers.
//!
//! Register addresses and bit positions are only spelled out here. Kernel code names
//! a [`Field`] and lets the [`RegisterBus`] of the port decide how the access reaches
//! the hardware, or a mock register bank in the simulator.
use bit_field::BitField;
use core::ops::Range;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Register {
    pub name: &'static str,
    pub address: usize,
}

impl Register {
    pub const fn new(name: &'static str, address: usize) -> Register {
        Register { name, address }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Field {
    pub register: Register,
    pub name: &'static str,
    pub bits: Range<usize>,
}

impl Field {
    pub const fn new(register: Register, name: &'static str, bits: Range<usize>) -> Field {
        Field {
            register,
            name,
            bits,
        }
    }

    /// Field value within a register value.
    pub fn extract(&self, register_value: u32) -> u32 {
        register_value.get_bits(self.bits.clone())
    }

    /// Register value with `value` placed in this field and every other bit from `register_value`.
    pub fn insert(&self, register_value: u32, value: u32) -> u32 {
        let mut register_value = register_value;
        register_value.set_bits(self.bits.clone(), value);
        register_value
    }

    /// All-ones value of the field, e.g. the lowest urgency for a priority field.
    pub fn max_value(&self) -> u32 {
        let width = self.bits.end - self.bits.start;
        if width >= 32 {
            u32::MAX
        } else {
            (1u32 << width) - 1
        }
    }
}

/// System Control Block, Interrupt Control and State Register
pub const SCB_ICSR: Register = Register::new("SCB.ICSR", 0xE000_ED04);
/// Write 1 to pend the PendSV exception, the deferred context switch request.
pub const ICSR_PENDSVSET: Field = Field::new(SCB_ICSR, "PENDSVSET", 28..29);
/// Write 1 to withdraw a pending PendSV.
pub const ICSR_PENDSVCLR: Field = Field::new(SCB_ICSR, "PENDSVCLR", 27..28);

/// System Handler Priority Register 3
pub const SCB_SHPR3: Register = Register::new("SCB.SHPR3", 0xE000_ED20);
pub const SHPR3_PRI_PENDSV: Field = Field::new(SCB_SHPR3, "PRI_14", 16..24);
pub const SHPR3_PRI_SYSTICK: Field = Field::new(SCB_SHPR3, "PRI_15", 24..32);

/// CONTROL.SPSEL: thread mode runs on the process stack pointer.
pub const CONTROL_SPSEL: u32 = 1 << 1;

pub trait RegisterBus {
    fn read(&self, register: Register) -> u32;

    fn write(&self, register: Register, value: u32);

    fn read_field(&self, field: &Field) -> u32 {
        field.extract(self.read(field.register))
    }

    /// Read-modify-write of a single field.
    fn modify_field(&self, field: &Field, value: u32) {
        let current = self.read(field.register);
        self.write(field.register, field.insert(current, value));
    }

    /// Writes `value` into the field with every other bit zero. For write-one-to-set
    /// registers like ICSR, where a read-modify-write would replay other set bits.
    fn write_field(&self, field: &Field, value: u32) {
        self.write(field.register, field.insert(0, value));
    }
}

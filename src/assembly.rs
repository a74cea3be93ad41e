use ::std::collections::HashMap;
use ::std::io::{self, Write};
use super::instructions::Instruction;

#[derive(Debug)]
pub struct Assembly {
    pub name: String,
    pub program: Vec<Instruction>,
    pub labels: LabelTable,
}

impl Assembly {
    pub fn fetch(&self, address: usize) -> Option<&Instruction> {
        self.program.get(address)
    }

    pub fn len(&self) -> usize {
        self.program.len()
    }

    pub fn is_empty(&self) -> bool {
        self.program.is_empty()
    }
}

/// Sealed label table: label name to instruction address.
///
/// Only [`LabelTableBuilder::seal`] creates one and it has no mutators, so
/// once the loader hands it over the table stays fixed for the whole run.
#[derive(Clone, Debug, Default)]
pub struct LabelTable {
    offsets: HashMap<String, usize>,
}

impl LabelTable {
    pub fn get(&self, name: &str) -> Option<usize> {
        self.offsets.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// Labels ordered by address, then name.
    pub fn sorted(&self) -> Vec<(&str, usize)> {
        let mut labels: Vec<_> = self
            .offsets
            .iter()
            .map(|(name, offset)| (name.as_str(), *offset))
            .collect();
        labels.sort_by(|a, b| a.1.cmp(&b.1).then(a.0.cmp(b.0)));
        labels
    }
}

pub struct LabelTableBuilder {
    offsets: HashMap<String, usize>,
    capacity: usize,
}

impl LabelTableBuilder {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            offsets: HashMap::new(),
            capacity,
        }
    }

    /// Records a label. Redeclaring a name overwrites its address.
    /// Returns `false` when a new name would exceed the capacity.
    pub fn declare(&mut self, name: &str, offset: usize) -> bool {
        if let Some(existing) = self.offsets.get_mut(name) {
            *existing = offset;
            return true;
        }
        if self.offsets.len() >= self.capacity {
            return false;
        }
        self.offsets.insert(name.to_owned(), offset);
        true
    }

    pub fn seal(self) -> LabelTable {
        LabelTable {
            offsets: self.offsets,
        }
    }
}

pub fn print_assembly<W: Write>(out: &mut W, asm: &Assembly) -> io::Result<()> {
    writeln!(out, "Assembly '{}' - {} instructions:", &asm.name, asm.len())?;
    let labels = asm.labels.sorted();
    for (idx, instruction) in asm.program.iter().enumerate() {
        for (name, _) in labels.iter().filter(|(_, offset)| *offset == idx) {
            writeln!(out, " {}:", name)?;
        }
        writeln!(out, "  [{:0>4}] {:<24} ; line {}", idx, instruction.inst.to_string(), instruction.line)?;
    }
    for (name, _) in labels.iter().filter(|(_, offset)| *offset >= asm.len()) {
        writeln!(out, " {}:", name)?;
    }
    Ok(())
}

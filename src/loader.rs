use ::std::fs;
use ::std::path::Path;
use super::assembly::{Assembly, LabelTableBuilder};
use super::config::Limits;
use super::errors::LoadError;
use super::instructions::{Inst, Instruction};

const COMMENT_CHAR: char = '#';
const LABEL_MARK: char = ':';

enum Line<'a> {
    Skip,
    Label(&'a str),
    Code(&'a str),
}

fn classify(raw: &str) -> Line<'_> {
    let line = raw.trim();
    if line.is_empty() || line.starts_with(COMMENT_CHAR) {
        return Line::Skip;
    }
    match line.find(LABEL_MARK) {
        Some(colon) => Line::Label(line[..colon].split_whitespace().next().unwrap_or("")),
        None => Line::Code(line),
    }
}

/// Two-pass assembler: the first pass resolves label addresses, the second
/// decodes instructions.
pub struct Loader {
    limits: Limits,
}

impl Loader {
    pub fn new(limits: Limits) -> Self {
        Self { limits }
    }

    pub fn load<P: AsRef<Path>>(&self, path: P) -> Result<Assembly, LoadError> {
        let path = path.as_ref();
        let source = fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_owned(),
            source,
        })?;
        self.load_source(path.display().to_string(), &source)
    }

    pub fn load_source(&self, name: impl Into<String>, source: &str) -> Result<Assembly, LoadError> {
        let mut labels = LabelTableBuilder::with_capacity(self.limits.max_labels);
        let mut offset = 0;
        for (idx, raw) in source.lines().enumerate() {
            match classify(raw) {
                Line::Skip => {}
                Line::Label(name) => {
                    if name.is_empty() {
                        warn!("line {}: label declaration without a name", idx + 1);
                    }
                    if !labels.declare(name, offset) {
                        return Err(LoadError::TooManyLabels {
                            name: name.to_owned(),
                            line: idx + 1,
                            limit: self.limits.max_labels,
                        });
                    }
                }
                Line::Code(_) => {
                    offset += 1;
                    if offset > self.limits.max_instructions {
                        return Err(LoadError::TooManyInstructions {
                            limit: self.limits.max_instructions,
                        });
                    }
                }
            }
        }

        let mut program = Vec::with_capacity(offset);
        for (idx, raw) in source.lines().enumerate() {
            if let Line::Code(line) = classify(raw) {
                if let Some(inst) = parse_instruction(line) {
                    program.push(Instruction { inst, line: idx + 1 });
                }
            }
        }

        Ok(Assembly {
            name: name.into(),
            program,
            labels: labels.seal(),
        })
    }
}

fn parse_instruction(line: &str) -> Option<Inst> {
    let mut parts = line.split_whitespace();
    let opcode = parts.next()?;
    let arg1 = parts.next().unwrap_or("");
    let arg2 = parts.next().unwrap_or("");
    Some(Inst::decode(opcode, arg1, arg2))
}

//! Instruction-level program representation.
//!
//! This is the boundary with the front-end: a program is a list of
//! functions, each a list of basic blocks of instructions. Every
//! instruction has an id, and the id doubles as the local slot that holds
//! the instruction's result. All types are serde-serializable so programs
//! can be exchanged as JSON.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::{BinaryOp, CmpOp, Width};

/// Id of an instruction, and of the local slot holding its result.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct InstId(pub u32);

/// Index of a basic block inside its function.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct BlockId(pub u32);

impl fmt::Display for InstId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{}", self.0)
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bb{}", self.0)
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub enum Operand {
    Int(i32),
    Bool(bool),
    /// Result of another instruction.
    Value(InstId),
}

impl From<InstId> for Operand {
    fn from(id: InstId) -> Self {
        Operand::Value(id)
    }
}

impl From<i32> for Operand {
    fn from(value: i32) -> Self {
        Operand::Int(value)
    }
}

impl From<bool> for Operand {
    fn from(value: bool) -> Self {
        Operand::Bool(value)
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Int(v) => write!(f, "{}", v),
            Operand::Bool(b) => write!(f, "{}", b),
            Operand::Value(id) => write!(f, "{}", id),
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "op")]
pub enum InstKind {
    /// Reserve a local slot of the given width.
    Alloca { width: Width },
    Load { address: InstId },
    /// Store `value` into the slot `address`. Literal values are wrapped as
    /// constants of `width`.
    Store {
        value: Operand,
        address: InstId,
        width: Width,
    },
    Binary {
        kind: BinaryOp,
        lhs: Operand,
        rhs: Operand,
    },
    Cmp {
        kind: CmpOp,
        lhs: Operand,
        rhs: Operand,
    },
    Br { target: BlockId },
    CondBr {
        cond: Operand,
        then_block: BlockId,
        else_block: BlockId,
    },
    Ret { value: Option<Operand> },
    /// Turn the contents of slot `target` into a fresh symbolic input.
    MakeSymbolic {
        target: InstId,
        bytes: u32,
        name: String,
    },
    /// Call to an external function. Only `trap` has semantics.
    Call { callee: String, args: Vec<Operand> },
    Unreachable,
}

impl InstKind {
    pub fn is_terminator(&self) -> bool {
        matches!(
            self,
            InstKind::Br { .. } | InstKind::CondBr { .. } | InstKind::Ret { .. } | InstKind::Unreachable
        )
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Instruction {
    pub id: InstId,
    pub kind: InstKind,
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            InstKind::Alloca { width } => write!(f, "{} = alloca {}", self.id, width),
            InstKind::Load { address } => write!(f, "{} = load {}", self.id, address),
            InstKind::Store {
                value,
                address,
                width,
            } => write!(f, "store {} {}, {}", width, value, address),
            InstKind::Binary { kind, lhs, rhs } => {
                write!(f, "{} = {} {}, {}", self.id, kind, lhs, rhs)
            }
            InstKind::Cmp { kind, lhs, rhs } => {
                write!(f, "{} = icmp {} {}, {}", self.id, kind, lhs, rhs)
            }
            InstKind::Br { target } => write!(f, "br {}", target),
            InstKind::CondBr {
                cond,
                then_block,
                else_block,
            } => write!(f, "br {}, {}, {}", cond, then_block, else_block),
            InstKind::Ret { value: Some(v) } => write!(f, "ret {}", v),
            InstKind::Ret { value: None } => write!(f, "ret void"),
            InstKind::MakeSymbolic {
                target,
                bytes,
                name,
            } => write!(f, "call make_symbolic({}, {}, {:?})", target, bytes, name),
            InstKind::Call { callee, args } => {
                write!(f, "call {}(", callee)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
            InstKind::Unreachable => write!(f, "unreachable"),
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct BasicBlock {
    pub id: BlockId,
    pub name: String,
    pub instructions: Vec<Instruction>,
}

/// A function; its first block is the entry block.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Function {
    pub name: String,
    pub blocks: Vec<BasicBlock>,
}

impl Function {
    pub fn block(&self, id: BlockId) -> Option<&BasicBlock> {
        self.blocks.get(id.0 as usize).filter(|b| b.id == id)
    }

    pub fn entry(&self) -> Option<BlockId> {
        self.blocks.first().map(|b| b.id)
    }

    pub fn instruction(&self, pc: Pc) -> Option<&Instruction> {
        self.block(pc.block)?.instructions.get(pc.index)
    }
}

#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub functions: Vec<Function>,
}

impl Program {
    pub fn new(functions: Vec<Function>) -> Self {
        Self { functions }
    }

    pub fn function(&self, name: &str) -> Option<&Function> {
        self.functions.iter().find(|f| f.name == name)
    }
}

/// Program counter: instruction `index` of block `block`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct Pc {
    pub block: BlockId,
    pub index: usize,
}

impl Pc {
    pub fn new(block: BlockId, index: usize) -> Self {
        Self { block, index }
    }

    pub fn next(self) -> Self {
        Self::new(self.block, self.index + 1)
    }
}

impl fmt::Display for Pc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.block, self.index)
    }
}

/// Incremental construction of a [`Function`].
///
/// Instructions are appended to the current block; [`FunctionBuilder::block`]
/// creates a block and makes it current, [`FunctionBuilder::switch_to`]
/// returns to an existing one.
#[derive(Debug)]
pub struct FunctionBuilder {
    name: String,
    blocks: Vec<BasicBlock>,
    current: Option<usize>,
    next_id: u32,
}

impl FunctionBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            blocks: Vec::new(),
            current: None,
            next_id: 0,
        }
    }

    pub fn block(&mut self, name: impl Into<String>) -> BlockId {
        let id = BlockId(self.blocks.len() as u32);
        self.blocks.push(BasicBlock {
            id,
            name: name.into(),
            instructions: Vec::new(),
        });
        self.current = Some(id.0 as usize);
        id
    }

    pub fn switch_to(&mut self, block: BlockId) {
        assert!(
            (block.0 as usize) < self.blocks.len(),
            "No such block: {}",
            block
        );
        self.current = Some(block.0 as usize);
    }

    fn push(&mut self, kind: InstKind) -> InstId {
        let current = self.current.expect("No current block, call `block` first");
        let id = InstId(self.next_id);
        self.next_id += 1;
        self.blocks[current].instructions.push(Instruction { id, kind });
        id
    }

    pub fn alloca(&mut self, width: Width) -> InstId {
        self.push(InstKind::Alloca { width })
    }

    pub fn load(&mut self, address: InstId) -> InstId {
        self.push(InstKind::Load { address })
    }

    pub fn store(&mut self, value: impl Into<Operand>, address: InstId, width: Width) -> InstId {
        self.push(InstKind::Store {
            value: value.into(),
            address,
            width,
        })
    }

    pub fn binary(&mut self, kind: BinaryOp, lhs: impl Into<Operand>, rhs: impl Into<Operand>) -> InstId {
        self.push(InstKind::Binary {
            kind,
            lhs: lhs.into(),
            rhs: rhs.into(),
        })
    }

    pub fn cmp(&mut self, kind: CmpOp, lhs: impl Into<Operand>, rhs: impl Into<Operand>) -> InstId {
        self.push(InstKind::Cmp {
            kind,
            lhs: lhs.into(),
            rhs: rhs.into(),
        })
    }

    pub fn br(&mut self, target: BlockId) -> InstId {
        self.push(InstKind::Br { target })
    }

    pub fn cond_br(&mut self, cond: impl Into<Operand>, then_block: BlockId, else_block: BlockId) -> InstId {
        self.push(InstKind::CondBr {
            cond: cond.into(),
            then_block,
            else_block,
        })
    }

    pub fn ret(&mut self, value: Option<Operand>) -> InstId {
        self.push(InstKind::Ret { value })
    }

    pub fn make_symbolic(&mut self, target: InstId, bytes: u32, name: impl Into<String>) -> InstId {
        self.push(InstKind::MakeSymbolic {
            target,
            bytes,
            name: name.into(),
        })
    }

    pub fn call(&mut self, callee: impl Into<String>, args: Vec<Operand>) -> InstId {
        self.push(InstKind::Call {
            callee: callee.into(),
            args,
        })
    }

    pub fn unreachable(&mut self) -> InstId {
        self.push(InstKind::Unreachable)
    }

    pub fn build(self) -> Function {
        Function {
            name: self.name,
            blocks: self.blocks,
        }
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    fn branchy() -> Function {
        let mut b = FunctionBuilder::new("main");
        let entry = b.block("entry");
        let x = b.alloca(Width::INT32);
        b.make_symbolic(x, 4, "X");
        let v = b.load(x);
        let c = b.cmp(CmpOp::Slt, v, 0);
        let then_block = b.block("then");
        b.ret(Some(Operand::Int(1)));
        let else_block = b.block("else");
        b.ret(Some(Operand::Int(0)));
        b.switch_to(entry);
        b.cond_br(c, then_block, else_block);
        b.build()
    }

    #[test]
    fn test_builder() {
        let f = branchy();
        assert_eq!(f.blocks.len(), 3);
        assert_eq!(f.entry(), Some(BlockId(0)));
        let last = f.instruction(Pc::new(BlockId(0), 4)).unwrap();
        assert!(last.kind.is_terminator());
        assert_eq!(last.to_string(), "br %3, bb1, bb2");
        assert_eq!(f.instruction(Pc::new(BlockId(0), 5)), None);
        assert_eq!(f.block(BlockId(7)), None);
    }

    #[test]
    fn test_display() {
        let f = branchy();
        let rendered: Vec<String> = f.blocks[0].instructions.iter().map(|i| i.to_string()).collect();
        assert_eq!(
            rendered,
            vec![
                "%0 = alloca i32",
                "call make_symbolic(%0, 4, \"X\")",
                "%2 = load %0",
                "%3 = icmp slt %2, 0",
                "br %3, bb1, bb2",
            ]
        );
        assert_eq!(Pc::new(BlockId(2), 1).to_string(), "bb2:1");
    }

    #[test]
    fn test_lookup() {
        let program = Program::new(vec![branchy()]);
        assert!(program.function("main").is_some());
        assert!(program.function("other").is_none());
    }
}

//! Mutable storage for stencil programs.
//!
//! Ops, values, blocks and regions live in `PrimaryMap`s owned by
//! [`IrContext`] and are addressed through the `Copy` handles in
//! [`crate::refs`]. Each value keeps the list of operand slots that read it,
//! so a tensor result can be swapped for its memref view in one call and a
//! definition with no readers can be recognized without scanning.
//!
//! The context only offers the edits bufferization is built from:
//! retyping a value, moving ops between blocks, handing a region to a new
//! op, rewiring uses, and erasing ops.

use std::collections::BTreeMap;

use cranelift_entity::{PrimaryMap, SecondaryMap};
use smallvec::SmallVec;

use crate::location::Location;
use crate::refs::{BlockRef, OpRef, RegionRef, TypeRef, ValueDef, ValueRef};
use crate::symbol::Symbol;
use crate::types::{Attribute, PathInterner, TypeInterner};

/// Operand slot `slot` of `user` reads the value this is recorded under.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Use {
    user: OpRef,
    slot: u32,
}

struct ValueData {
    def: ValueDef,
    ty: TypeRef,
}

/// An operation. Operands and results are reached through [`IrContext`].
pub struct OperationData {
    pub location: Location,
    pub dialect: Symbol,
    pub name: Symbol,
    pub attributes: BTreeMap<Symbol, Attribute>,
    pub regions: SmallVec<[RegionRef; 2]>,
    pub parent_block: Option<BlockRef>,
    operands: SmallVec<[ValueRef; 4]>,
    results: SmallVec<[ValueRef; 1]>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockArgData {
    pub ty: TypeRef,
}

impl BlockArgData {
    pub fn new(ty: TypeRef) -> Self {
        Self { ty }
    }
}

pub struct BlockData {
    pub location: Location,
    pub args: Vec<BlockArgData>,
    pub ops: SmallVec<[OpRef; 8]>,
    pub parent_region: Option<RegionRef>,
}

pub struct RegionData {
    pub location: Location,
    pub blocks: SmallVec<[BlockRef; 1]>,
    pub parent_op: Option<OpRef>,
}

/// Owner of every IR entity plus the type and path interners.
#[derive(Default)]
pub struct IrContext {
    pub types: TypeInterner,
    pub paths: PathInterner,
    ops: PrimaryMap<OpRef, OperationData>,
    values: PrimaryMap<ValueRef, ValueData>,
    blocks: PrimaryMap<BlockRef, BlockData>,
    regions: PrimaryMap<RegionRef, RegionData>,
    block_args: SecondaryMap<BlockRef, SmallVec<[ValueRef; 4]>>,
    readers: SecondaryMap<ValueRef, SmallVec<[Use; 2]>>,
}

impl IrContext {
    pub fn new() -> Self {
        Self::default()
    }

    // ---- lookups ----

    pub fn op(&self, op: OpRef) -> &OperationData {
        &self.ops[op]
    }

    /// Attribute edits only; operands are rewired through
    /// [`replace_all_uses`](Self::replace_all_uses).
    pub fn op_mut(&mut self, op: OpRef) -> &mut OperationData {
        &mut self.ops[op]
    }

    pub fn op_operands(&self, op: OpRef) -> &[ValueRef] {
        &self.ops[op].operands
    }

    pub fn op_results(&self, op: OpRef) -> &[ValueRef] {
        &self.ops[op].results
    }

    pub fn op_result(&self, op: OpRef, index: u32) -> ValueRef {
        self.ops[op].results[index as usize]
    }

    pub fn op_result_ty(&self, op: OpRef, index: u32) -> TypeRef {
        self.value_ty(self.op_result(op, index))
    }

    pub fn value_ty(&self, v: ValueRef) -> TypeRef {
        self.values[v].ty
    }

    pub fn value_def(&self, v: ValueRef) -> ValueDef {
        self.values[v].def
    }

    /// `None` for block arguments.
    pub fn defining_op(&self, v: ValueRef) -> Option<OpRef> {
        match self.values[v].def {
            ValueDef::OpResult(op, _) => Some(op),
            ValueDef::BlockArg(..) => None,
        }
    }

    pub fn has_uses(&self, v: ValueRef) -> bool {
        !self.readers[v].is_empty()
    }

    pub fn block(&self, b: BlockRef) -> &BlockData {
        &self.blocks[b]
    }

    pub fn block_args(&self, b: BlockRef) -> &[ValueRef] {
        &self.block_args[b]
    }

    pub fn block_arg(&self, b: BlockRef, index: u32) -> ValueRef {
        self.block_args[b][index as usize]
    }

    pub fn region(&self, r: RegionRef) -> &RegionData {
        &self.regions[r]
    }

    // ---- creation ----

    fn new_value(&mut self, def: ValueDef, ty: TypeRef) -> ValueRef {
        self.values.push(ValueData { def, ty })
    }

    /// Register a block and one value per declared argument.
    pub fn create_block(&mut self, data: BlockData) -> BlockRef {
        let block = self.blocks.push(data);
        let tys: SmallVec<[TypeRef; 4]> = self.blocks[block].args.iter().map(|a| a.ty).collect();
        let args = tys
            .into_iter()
            .enumerate()
            .map(|(i, ty)| self.new_value(ValueDef::BlockArg(block, i as u32), ty))
            .collect();
        self.block_args[block] = args;
        block
    }

    /// # Panics
    ///
    /// Panics if one of the blocks already sits in a region.
    pub fn create_region(&mut self, data: RegionData) -> RegionRef {
        let region = self.regions.push(data);
        for i in 0..self.regions[region].blocks.len() {
            let block = self.regions[region].blocks[i];
            let slot = &mut self.blocks[block].parent_region;
            assert!(slot.is_none(), "create_region: {block} already sits in {slot:?}");
            *slot = Some(region);
        }
        region
    }

    // ---- mutation ----

    /// Change the type of `v` wherever it is recorded.
    pub fn retype_value(&mut self, v: ValueRef, ty: TypeRef) {
        self.values[v].ty = ty;
        if let ValueDef::BlockArg(block, index) = self.values[v].def {
            self.blocks[block].args[index as usize].ty = ty;
        }
    }

    /// Point every reader of `old` at `new`.
    pub fn replace_all_uses(&mut self, old: ValueRef, new: ValueRef) {
        if old == new {
            return;
        }
        for reader in std::mem::take(&mut self.readers[old]) {
            let slot = &mut self.ops[reader.user].operands[reader.slot as usize];
            debug_assert_eq!(*slot, old);
            *slot = new;
            self.readers[new].push(reader);
        }
    }

    /// # Panics
    ///
    /// Panics if `op` already sits in a block.
    pub fn push_op(&mut self, block: BlockRef, op: OpRef) {
        self.claim(op, block);
        self.blocks[block].ops.push(op);
    }

    /// Place `op` right before `anchor`, in `anchor`'s block.
    ///
    /// # Panics
    ///
    /// Panics if `anchor` is detached or `op` already sits in a block.
    pub fn insert_op_before(&mut self, anchor: OpRef, op: OpRef) {
        let Some(block) = self.ops[anchor].parent_block else {
            panic!("insert_op_before: anchor {anchor} is detached");
        };
        self.claim(op, block);
        let ops = &mut self.blocks[block].ops;
        let at = ops.iter().position(|&o| o == anchor).unwrap_or(ops.len());
        ops.insert(at, op);
    }

    fn claim(&mut self, op: OpRef, block: BlockRef) {
        let parent = &mut self.ops[op].parent_block;
        assert!(parent.is_none(), "{op} already sits in {parent:?}");
        *parent = Some(block);
    }

    /// Take `op` out of its block, if any, keeping it alive.
    pub fn detach_op(&mut self, op: OpRef) {
        if let Some(block) = self.ops[op].parent_block.take() {
            self.blocks[block].ops.retain(|o| *o != op);
        }
    }

    /// Move every op of `src` to the end of `dest`, in order.
    pub fn splice_ops(&mut self, src: BlockRef, dest: BlockRef) {
        let moved = std::mem::take(&mut self.blocks[src].ops);
        for &op in &moved {
            self.ops[op].parent_block = Some(dest);
        }
        self.blocks[dest].ops.extend(moved);
    }

    /// Release a region from its op so a rebuilt op can take it over.
    pub fn detach_region(&mut self, region: RegionRef) {
        if let Some(owner) = self.regions[region].parent_op.take() {
            self.ops[owner].regions.retain(|r| *r != region);
        }
    }

    /// Detach `op` and drop its operand edges. Nested regions are left as
    /// they are.
    ///
    /// # Panics
    ///
    /// Panics if one of its results is still read.
    pub fn erase_op(&mut self, op: OpRef) {
        for &v in &self.ops[op].results {
            let readers = self.readers[v].len();
            assert!(readers == 0, "erase_op: {op} result {v} still has {readers} use(s)");
        }
        self.detach_op(op);
        let operands = std::mem::take(&mut self.ops[op].operands);
        for (slot, v) in operands.into_iter().enumerate() {
            self.readers[v].retain(|r| !(r.user == op && r.slot == slot as u32));
        }
    }
}

/// Collects the parts of an op, then registers it with [`OpBuilder::create`].
pub struct OpBuilder {
    location: Location,
    dialect: Symbol,
    name: Symbol,
    operands: SmallVec<[ValueRef; 4]>,
    result_tys: SmallVec<[TypeRef; 1]>,
    attributes: BTreeMap<Symbol, Attribute>,
    regions: SmallVec<[RegionRef; 2]>,
}

impl OpBuilder {
    pub fn new(location: Location, dialect: impl Into<Symbol>, name: impl Into<Symbol>) -> Self {
        Self {
            location,
            dialect: dialect.into(),
            name: name.into(),
            operands: SmallVec::new(),
            result_tys: SmallVec::new(),
            attributes: BTreeMap::new(),
            regions: SmallVec::new(),
        }
    }

    pub fn operand(self, v: ValueRef) -> Self {
        self.operands([v])
    }

    pub fn operands(mut self, vs: impl IntoIterator<Item = ValueRef>) -> Self {
        self.operands.extend(vs);
        self
    }

    pub fn result(self, ty: TypeRef) -> Self {
        self.results([ty])
    }

    pub fn results(mut self, tys: impl IntoIterator<Item = TypeRef>) -> Self {
        self.result_tys.extend(tys);
        self
    }

    pub fn attr(mut self, key: impl Into<Symbol>, val: Attribute) -> Self {
        self.attributes.insert(key.into(), val);
        self
    }

    pub fn attrs(mut self, attrs: impl IntoIterator<Item = (Symbol, Attribute)>) -> Self {
        self.attributes.extend(attrs);
        self
    }

    pub fn region(mut self, r: RegionRef) -> Self {
        self.regions.push(r);
        self
    }

    /// Register the op, detached, with fresh result values.
    ///
    /// # Panics
    ///
    /// Panics if one of the regions already belongs to another op.
    pub fn create(self, ctx: &mut IrContext) -> OpRef {
        let op = ctx.ops.push(OperationData {
            location: self.location,
            dialect: self.dialect,
            name: self.name,
            attributes: self.attributes,
            regions: self.regions,
            parent_block: None,
            operands: self.operands,
            results: SmallVec::new(),
        });

        for i in 0..ctx.ops[op].regions.len() {
            let region = ctx.ops[op].regions[i];
            let owner = &mut ctx.regions[region].parent_op;
            assert!(owner.is_none(), "{region} already belongs to {owner:?}");
            *owner = Some(op);
        }
        for slot in 0..ctx.ops[op].operands.len() {
            let v = ctx.ops[op].operands[slot];
            ctx.readers[v].push(Use {
                user: op,
                slot: slot as u32,
            });
        }
        let results = self
            .result_tys
            .into_iter()
            .enumerate()
            .map(|(i, ty)| ctx.new_value(ValueDef::OpResult(op, i as u32), ty))
            .collect();
        ctx.ops[op].results = results;
        op
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin;
    use crate::location::Span;
    use smallvec::smallvec;

    fn setup() -> (IrContext, Location, TypeRef, TypeRef) {
        let mut ctx = IrContext::new();
        let path = ctx.paths.intern("file:///context.mlir".to_owned());
        let f32_ty = builtin::f32(&mut ctx.types);
        let t = builtin::tensor(&mut ctx.types, f32_ty, &[4]);
        let m = builtin::memref(&mut ctx.types, f32_ty, &[4]);
        (ctx, Location::new(path, Span::new(0, 0)), t, m)
    }

    fn block(ctx: &mut IrContext, loc: Location, args: &[TypeRef]) -> BlockRef {
        ctx.create_block(BlockData {
            location: loc,
            args: args.iter().copied().map(BlockArgData::new).collect(),
            ops: smallvec![],
            parent_region: None,
        })
    }

    fn producer(ctx: &mut IrContext, loc: Location, ty: TypeRef) -> OpRef {
        OpBuilder::new(loc, "test", "produce").result(ty).create(ctx)
    }

    fn consumer(ctx: &mut IrContext, loc: Location, vs: &[ValueRef]) -> OpRef {
        OpBuilder::new(loc, "test", "consume")
            .operands(vs.iter().copied())
            .create(ctx)
    }

    #[test]
    fn created_op_owns_results_and_regions() {
        let (mut ctx, loc, t, _) = setup();
        let body = block(&mut ctx, loc, &[t]);
        let region = ctx.create_region(RegionData {
            location: loc,
            blocks: smallvec![body],
            parent_op: None,
        });
        let op = OpBuilder::new(loc, "csl_stencil", "apply")
            .results([t, t])
            .attr("num_chunks", Attribute::from(2_i64))
            .region(region)
            .create(&mut ctx);

        assert_eq!(ctx.op(op).dialect, "csl_stencil");
        assert_eq!(ctx.op(op).parent_block, None);
        assert_eq!(ctx.op_results(op).len(), 2);
        assert_eq!(ctx.value_def(ctx.op_result(op, 1)), ValueDef::OpResult(op, 1));
        assert_eq!(ctx.op_result_ty(op, 0), t);
        assert_eq!(ctx.region(region).parent_op, Some(op));
        assert_eq!(ctx.block(body).parent_region, Some(region));
        assert_eq!(ctx.value_def(ctx.block_arg(body, 0)), ValueDef::BlockArg(body, 0));
        assert_eq!(ctx.defining_op(ctx.block_arg(body, 0)), None);
    }

    #[test]
    fn retype_keeps_block_signature_in_sync() {
        let (mut ctx, loc, t, m) = setup();
        let b = block(&mut ctx, loc, &[t, t]);
        let arg = ctx.block_arg(b, 1);
        ctx.retype_value(arg, m);
        assert_eq!(ctx.value_ty(arg), m);
        assert_eq!(ctx.block(b).args, vec![BlockArgData::new(t), BlockArgData::new(m)]);

        let p = producer(&mut ctx, loc, t);
        let v = ctx.op_result(p, 0);
        ctx.retype_value(v, m);
        assert_eq!(ctx.op_result_ty(p, 0), m);
    }

    #[test]
    fn rauw_moves_every_reader() {
        let (mut ctx, loc, t, m) = setup();
        let tensor = producer(&mut ctx, loc, t);
        let buffer = producer(&mut ctx, loc, m);
        let (tv, mv) = (ctx.op_result(tensor, 0), ctx.op_result(buffer, 0));
        let reader = consumer(&mut ctx, loc, &[tv, mv, tv]);

        ctx.replace_all_uses(tv, mv);
        assert!(!ctx.has_uses(tv));
        assert_eq!(ctx.op_operands(reader), &[mv, mv, mv]);

        // Every slot was re-registered: erasing the reader frees the buffer.
        ctx.erase_op(reader);
        assert!(!ctx.has_uses(mv));
    }

    #[test]
    fn insert_before_and_splice_keep_parents_consistent() {
        let (mut ctx, loc, t, _) = setup();
        let src = block(&mut ctx, loc, &[]);
        let dest = block(&mut ctx, loc, &[]);
        let a = producer(&mut ctx, loc, t);
        let b = producer(&mut ctx, loc, t);
        let c = producer(&mut ctx, loc, t);
        ctx.push_op(src, b);
        ctx.insert_op_before(b, a);
        ctx.push_op(dest, c);

        ctx.splice_ops(src, dest);
        assert!(ctx.block(src).ops.is_empty());
        assert_eq!(ctx.block(dest).ops.as_slice(), &[c, a, b]);
        assert!([a, b, c].iter().all(|&op| ctx.op(op).parent_block == Some(dest)));

        ctx.detach_op(a);
        assert_eq!(ctx.op(a).parent_block, None);
        assert_eq!(ctx.block(dest).ops.as_slice(), &[c, b]);
    }

    #[test]
    #[should_panic(expected = "already sits in")]
    fn op_cannot_sit_in_two_blocks() {
        let (mut ctx, loc, t, _) = setup();
        let (b1, b2) = (block(&mut ctx, loc, &[]), block(&mut ctx, loc, &[]));
        let op = producer(&mut ctx, loc, t);
        ctx.push_op(b1, op);
        ctx.push_op(b2, op);
    }

    #[test]
    #[should_panic(expected = "still has 1 use(s)")]
    fn erasing_a_read_definition_panics() {
        let (mut ctx, loc, t, _) = setup();
        let p = producer(&mut ctx, loc, t);
        let v = ctx.op_result(p, 0);
        consumer(&mut ctx, loc, &[v]);
        ctx.erase_op(p);
    }

    #[test]
    fn detached_region_can_move_to_a_new_op() {
        let (mut ctx, loc, _, _) = setup();
        let body = block(&mut ctx, loc, &[]);
        let region = ctx.create_region(RegionData {
            location: loc,
            blocks: smallvec![body],
            parent_op: None,
        });
        let old = OpBuilder::new(loc, "func", "func").region(region).create(&mut ctx);

        ctx.detach_region(region);
        assert!(ctx.op(old).regions.is_empty());
        let new = OpBuilder::new(loc, "func", "func").region(region).create(&mut ctx);
        assert_eq!(ctx.region(region).parent_op, Some(new));
    }
}

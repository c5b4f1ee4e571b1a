//! Text form of the IR, for snapshot tests and debug logs.
//!
//! ```text
//! core.module @demo {
//!   func.func @main(%0: tensor<8xf32>) -> tensor<8xf32> {
//!     %1 = bufferization.to_memref %0 : memref<8xf32>
//!     func.return %0
//!   }
//! }
//! ```
//!
//! Tensors, memrefs and fields have a compact `kind<dims x element>` form.
//! Any other type prints as `dialect.name(params) {attrs}`.

use std::collections::{BTreeMap, HashMap};
use std::fmt::{self, Write};

use crate::builtin::{self, DYNAMIC_INDEX, ShapedType, TypeKind};
use crate::context::IrContext;
use crate::dialect::{core, func};
use crate::ops::DialectOp;
use crate::refs::{BlockRef, OpRef, RegionRef, TypeRef, ValueRef};
use crate::symbol::Symbol;
use crate::types::Attribute;

pub fn print_type(ctx: &IrContext, ty: TypeRef) -> String {
    let mut out = String::new();
    write_type(ctx, &mut out, ty).expect("writing to a String cannot fail");
    out
}

/// Values are numbered from `%0` again in every op directly under the module.
pub fn print_module(ctx: &IrContext, root: OpRef) -> String {
    let mut printer = Printer::new(ctx);
    printer.module(root).expect("writing to a String cannot fail");
    printer.out
}

/// Write `items` separated by `", "`.
fn comma<W: Write, T>(
    f: &mut W,
    items: impl IntoIterator<Item = T>,
    mut each: impl FnMut(&mut W, T) -> fmt::Result,
) -> fmt::Result {
    for (i, item) in items.into_iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        each(f, item)?;
    }
    Ok(())
}

fn write_type<W: Write>(ctx: &IrContext, f: &mut W, ty: TypeRef) -> fmt::Result {
    match builtin::classify(&ctx.types, ty) {
        TypeKind::Tensor(shaped) => write_shaped(ctx, f, "tensor", &shaped),
        TypeKind::MemRef(shaped) => write_shaped(ctx, f, "memref", &shaped),
        TypeKind::Field(field) => {
            f.write_str("stencil.field<")?;
            for (lb, ub) in &field.bounds {
                write!(f, "[{lb},{ub}]x")?;
            }
            write_type(ctx, f, field.element)?;
            f.write_char('>')
        }
        TypeKind::Function(sig) => {
            write_types(ctx, f, &sig.inputs)?;
            f.write_str(" -> ")?;
            write_types(ctx, f, &sig.outputs)
        }
        TypeKind::Scalar(name) => write!(f, "{name}"),
        TypeKind::Other => {
            let data = ctx.types.get(ty);
            write!(f, "{}.{}", data.dialect, data.name)?;
            if !data.params.is_empty() {
                write_types(ctx, f, &data.params)?;
            }
            write_attrs(ctx, f, &data.attrs)
        }
    }
}

fn write_shaped<W: Write>(
    ctx: &IrContext,
    f: &mut W,
    kind: &str,
    shaped: &ShapedType,
) -> fmt::Result {
    write!(f, "{kind}<")?;
    for &extent in &shaped.shape {
        match extent {
            DYNAMIC_INDEX => f.write_str("?x")?,
            _ => write!(f, "{extent}x")?,
        }
    }
    write_type(ctx, f, shaped.element)?;
    f.write_char('>')
}

/// `(T, U, ...)`
fn write_types<W: Write>(ctx: &IrContext, f: &mut W, tys: &[TypeRef]) -> fmt::Result {
    f.write_char('(')?;
    comma(f, tys, |f, &ty| write_type(ctx, f, ty))?;
    f.write_char(')')
}

/// ` {key = value, ...}` sorted by key text, or nothing for an empty map.
fn write_attrs<W: Write>(
    ctx: &IrContext,
    f: &mut W,
    attrs: &BTreeMap<Symbol, Attribute>,
) -> fmt::Result {
    if attrs.is_empty() {
        return Ok(());
    }
    // Symbols order by interning, not by text.
    let mut sorted: Vec<(String, &Attribute)> =
        attrs.iter().map(|(key, val)| (key.to_string(), val)).collect();
    sorted.sort_by(|a, b| a.0.cmp(&b.0));
    f.write_str(" {")?;
    comma(f, sorted, |f, (key, val)| {
        write!(f, "{key} = ")?;
        write_attr(ctx, f, val)
    })?;
    f.write_char('}')
}

fn write_attr<W: Write>(ctx: &IrContext, f: &mut W, attr: &Attribute) -> fmt::Result {
    match attr {
        Attribute::Unit => f.write_str("unit"),
        Attribute::Bool(b) => write!(f, "{b}"),
        Attribute::IntBits(bits) => write!(f, "{}", *bits as i64),
        Attribute::FloatBits(bits) => {
            let v = f64::from_bits(*bits);
            // Whole floats keep a fractional digit so they never read as ints.
            if v.is_finite() && v.fract() == 0.0 {
                write!(f, "{v:.1}")
            } else {
                write!(f, "{v}")
            }
        }
        Attribute::Type(ty) => write_type(ctx, f, *ty),
        Attribute::Symbol(sym) => write!(f, "@{sym}"),
        Attribute::List(items) => {
            f.write_char('[')?;
            comma(f, items, |f, item| write_attr(ctx, f, item))?;
            f.write_char(']')
        }
        Attribute::DenseElements(dense) => {
            f.write_str("dense<")?;
            comma(f, &dense.data, |f, item| write_attr(ctx, f, item))?;
            f.write_char('>')
        }
    }
}

struct Printer<'a> {
    ctx: &'a IrContext,
    out: String,
    names: HashMap<ValueRef, usize>,
    /// Next `^bbN` label for blocks inside op regions.
    next_label: usize,
}

impl<'a> Printer<'a> {
    fn new(ctx: &'a IrContext) -> Self {
        Self {
            ctx,
            out: String::new(),
            names: HashMap::new(),
            next_label: 0,
        }
    }

    /// Name a value at its definition.
    fn define(&mut self, v: ValueRef) -> String {
        let fresh = self.names.len();
        format!("%{}", self.names.entry(v).or_insert(fresh))
    }

    /// Name a value at a use. Uses of values defined outside the printed
    /// scope show as `%?`.
    fn refer(&self, v: ValueRef) -> String {
        self.names
            .get(&v)
            .map_or_else(|| "%?".to_owned(), |n| format!("%{n}"))
    }

    fn indent(&mut self, width: usize) -> fmt::Result {
        write!(self.out, "{:width$}", "")
    }

    fn module(&mut self, op: OpRef) -> fmt::Result {
        let ctx = self.ctx;
        let Ok(module) = core::Module::from_op(ctx, op) else {
            return self.op(op, 0);
        };
        self.out.push_str("core.module");
        if let Some(name) = module.sym_name(ctx) {
            write!(self.out, " @{name}")?;
        }
        self.out.push_str(" {\n");
        for &block in &ctx.region(module.body(ctx)).blocks {
            for &child in &ctx.block(block).ops {
                self.names.clear();
                self.next_label = 0;
                self.op(child, 2)?;
            }
        }
        self.out.push_str("}\n");
        Ok(())
    }

    fn op(&mut self, op: OpRef, indent: usize) -> fmt::Result {
        let ctx = self.ctx;
        if core::Module::matches(ctx, op) {
            return self.module(op);
        }
        if let Ok(func) = func::Func::from_op(ctx, op) {
            return self.func(func, indent);
        }

        self.indent(indent)?;
        let results = ctx.op_results(op);
        if !results.is_empty() {
            let names: Vec<String> = results.iter().map(|&v| self.define(v)).collect();
            write!(self.out, "{} = ", names.join(", "))?;
        }
        let data = ctx.op(op);
        write!(self.out, "{}.{}", data.dialect, data.name)?;
        let operands = ctx.op_operands(op);
        if !operands.is_empty() {
            let names: Vec<String> = operands.iter().map(|&v| self.refer(v)).collect();
            write!(self.out, " {}", names.join(", "))?;
        }
        write_attrs(ctx, &mut self.out, &data.attributes)?;
        if !results.is_empty() {
            self.out.push_str(" : ");
            comma(&mut self.out, results, |f, &v| write_type(ctx, f, ctx.value_ty(v)))?;
        }
        for &region in &data.regions {
            self.out.push_str(" {\n");
            self.region(region, indent + 2)?;
            self.indent(indent)?;
            self.out.push('}');
        }
        self.out.push('\n');
        Ok(())
    }

    /// A lone block without arguments prints without its `^bbN:` header.
    fn region(&mut self, region: RegionRef, indent: usize) -> fmt::Result {
        let ctx = self.ctx;
        let blocks = &ctx.region(region).blocks;
        let headless = blocks.len() == 1 && ctx.block_args(blocks[0]).is_empty();
        for &block in blocks {
            if !headless {
                let label = self.next_label;
                self.next_label += 1;
                self.block_header(block, label, indent)?;
            }
            self.block_body(block, indent + 2)?;
        }
        Ok(())
    }

    fn block_header(&mut self, block: BlockRef, label: usize, indent: usize) -> fmt::Result {
        let ctx = self.ctx;
        let args = ctx.block_args(block);
        self.indent(indent)?;
        write!(self.out, "^bb{label}")?;
        if !args.is_empty() {
            self.out.push('(');
            self.typed_args(args)?;
            self.out.push(')');
        }
        self.out.push_str(":\n");
        Ok(())
    }

    fn block_body(&mut self, block: BlockRef, indent: usize) -> fmt::Result {
        let ctx = self.ctx;
        for &op in &ctx.block(block).ops {
            self.op(op, indent)?;
        }
        Ok(())
    }

    /// `%0: T, %1: U`, defining each name.
    fn typed_args(&mut self, args: &[ValueRef]) -> fmt::Result {
        let ctx = self.ctx;
        for (i, &arg) in args.iter().enumerate() {
            if i > 0 {
                self.out.push_str(", ");
            }
            let name = self.define(arg);
            write!(self.out, "{name}: ")?;
            write_type(ctx, &mut self.out, ctx.value_ty(arg))?;
        }
        Ok(())
    }

    /// Entry block arguments print in the signature; later blocks are
    /// labelled by position.
    fn func(&mut self, func: func::Func, indent: usize) -> fmt::Result {
        let ctx = self.ctx;
        self.indent(indent)?;
        write!(self.out, "func.func @{}(", func.sym_name(ctx))?;
        let blocks = &ctx.region(func.body(ctx)).blocks;
        if let Some(&entry) = blocks.first() {
            self.typed_args(ctx.block_args(entry))?;
        }
        self.out.push(')');

        if let TypeKind::Function(sig) = builtin::classify(&ctx.types, func.r#type(ctx)) {
            match sig.outputs.as_slice() {
                [] => {}
                [single] => {
                    self.out.push_str(" -> ");
                    write_type(ctx, &mut self.out, *single)?;
                }
                many => {
                    self.out.push_str(" -> ");
                    write_types(ctx, &mut self.out, many)?;
                }
            }
        }
        self.out.push_str(" {\n");
        for (i, &block) in blocks.iter().enumerate() {
            if i > 0 {
                self.block_header(block, i, indent + 2)?;
            }
            self.block_body(block, indent + 2)?;
        }
        self.indent(indent)?;
        self.out.push_str("}\n");
        Ok(())
    }
}

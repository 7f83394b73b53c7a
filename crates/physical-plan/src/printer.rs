use crate::expr::PhysicalExpr;
use crate::params::SharedParams;
use crate::plan::{PhysicalPlan, PlanNode};
use colstore_primitives::{ColList, IndexId, ParamId};
use colstore_schema::types::ProductType;
use itertools::Itertools;
use std::fmt;

/// The options for the printer
///
/// By default:
///
/// * `show_types: false`
#[derive(Debug, Copy, Clone, Default)]
pub struct ExplainOptions {
    pub show_types: bool,
}

impl ExplainOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_types(mut self) -> Self {
        self.show_types = true;
        self
    }
}

/// A pretty printer for physical expressions,
/// resolving field positions to names in `row`
struct PrintExpr<'a> {
    expr: &'a PhysicalExpr,
    row: &'a ProductType,
}

impl<'a> PrintExpr<'a> {
    fn new(expr: &'a PhysicalExpr, row: &'a ProductType) -> Self {
        Self { expr, row }
    }

    fn with<'b>(&'b self, expr: &'b PhysicalExpr) -> PrintExpr<'b> {
        PrintExpr::new(expr, self.row)
    }
}

/// A field name, or its position if the name is empty
struct PrintField<'a> {
    pos: usize,
    row: &'a ProductType,
}

/// A pretty printer for objects that could have a empty name
enum PrintName<'a> {
    Named { name: &'a str },
    Id { object: &'a str, id: usize },
}

impl<'a> PrintName<'a> {
    fn new(object: &'a str, id: usize, name: &'a str) -> Self {
        if name.is_empty() {
            Self::Id { object, id }
        } else {
            Self::Named { name }
        }
    }

    fn index(index_id: IndexId, index_name: &'a str) -> Self {
        Self::new("index", index_id.idx(), index_name)
    }
}

/// A formated line of output
enum Line<'a> {
    SemiJoin {
        ident: u16,
    },
    JoinCond {
        lhs: Vec<PrintField<'a>>,
        rhs: Vec<PrintField<'a>>,
        ident: u16,
    },
    TableScan {
        table: &'a str,
        ident: u16,
    },
    Columns {
        columns: Vec<PrintField<'a>>,
        ident: u16,
    },
    ResidualFilter {
        ident: u16,
    },
    IxIntersect {
        ident: u16,
    },
    IxMerge {
        ident: u16,
    },
    IxSearch {
        table: &'a str,
        index: PrintName<'a>,
        ident: u16,
    },
    SearchFlags {
        unique_key: bool,
        outer: bool,
        ident: u16,
    },
    Params {
        params: SharedParams,
        ident: u16,
    },
    RidLimit {
        param: ParamId,
        ident: u16,
    },
    Sort {
        keys: Vec<PrintField<'a>>,
        distinct: bool,
        ident: u16,
    },
    Project {
        exprs: Vec<PrintExpr<'a>>,
        ident: u16,
    },
    Filter {
        expr: PrintExpr<'a>,
        ident: u16,
    },
}

impl Line<'_> {
    fn ident(&self) -> usize {
        let ident = match self {
            Line::SemiJoin { ident, .. } => *ident,
            Line::JoinCond { ident, .. } => *ident,
            Line::TableScan { ident, .. } => *ident,
            Line::Columns { ident, .. } => *ident,
            Line::ResidualFilter { ident, .. } => *ident,
            Line::IxIntersect { ident, .. } => *ident,
            Line::IxMerge { ident, .. } => *ident,
            Line::IxSearch { ident, .. } => *ident,
            Line::SearchFlags { ident, .. } => *ident,
            Line::Params { ident, .. } => *ident,
            Line::RidLimit { ident, .. } => *ident,
            Line::Sort { ident, .. } => *ident,
            Line::Project { ident, .. } => *ident,
            Line::Filter { ident, .. } => *ident,
        };
        ident as usize
    }
}

fn fields<'a>(cols: &ColList, row: &'a ProductType) -> Vec<PrintField<'a>> {
    cols.iter().map(|col| PrintField { pos: col.idx(), row }).collect()
}

fn eval_plan<'a>(lines: &mut Vec<Line<'a>>, plan: &'a PlanNode, ident: u16) {
    match plan.plan() {
        PhysicalPlan::SemiJoin(join) => {
            lines.push(Line::SemiJoin { ident });
            lines.push(Line::JoinCond {
                lhs: fields(&join.lhs_keys, join.lhs.row_type()),
                rhs: fields(&join.rhs_keys, join.rhs.row_type()),
                ident: ident + 2,
            });
            eval_plan(lines, &join.lhs, ident + 2);
            eval_plan(lines, &join.rhs, ident + 2);
        }
        PhysicalPlan::TableScan(scan) => {
            lines.push(Line::TableScan {
                table: &scan.schema.table_name,
                ident,
            });
            if let Some(cols) = &scan.projected_columns {
                lines.push(Line::Columns {
                    columns: fields(cols, scan.schema.get_row_type()),
                    ident: ident + 2,
                });
            }
            if scan.has_extra_filter {
                lines.push(Line::ResidualFilter { ident: ident + 2 });
            }
            for input in &scan.inputs {
                eval_plan(lines, input, ident + 2);
            }
        }
        PhysicalPlan::IxIntersect(intersect) => {
            lines.push(Line::IxIntersect { ident });
            lines.push(Line::Params {
                params: intersect.params,
                ident: ident + 2,
            });
            for input in &intersect.inputs {
                eval_plan(lines, input, ident + 2);
            }
        }
        PhysicalPlan::IxMerge(merge) => {
            lines.push(Line::IxMerge { ident });
            lines.push(Line::RidLimit {
                param: merge.rid_limit,
                ident: ident + 2,
            });
            if let Some(params) = merge.params {
                lines.push(Line::Params {
                    params,
                    ident: ident + 2,
                });
            }
            eval_plan(lines, &merge.input, ident + 2);
        }
        PhysicalPlan::IxSearch(search) => {
            let name = search.scan.index().map_or("", |index| &*index.index_name);
            lines.push(Line::IxSearch {
                table: &search.scan.schema.table_name,
                index: PrintName::index(search.scan.index_id, name),
                ident,
            });
            lines.push(Line::SearchFlags {
                unique_key: search.unique_key,
                outer: search.outer,
                ident: ident + 2,
            });
            if let Some(params) = search.params {
                lines.push(Line::Params {
                    params,
                    ident: ident + 2,
                });
            }
            eval_plan(lines, &search.input, ident + 2);
        }
        PhysicalPlan::Sort(sort) => {
            lines.push(Line::Sort {
                keys: fields(&sort.keys, sort.input.row_type()),
                distinct: sort.discard_duplicates,
                ident,
            });
            eval_plan(lines, &sort.input, ident + 2);
        }
        PhysicalPlan::Project(project) => {
            lines.push(Line::Project {
                exprs: project
                    .fields
                    .iter()
                    .map(|field| PrintExpr::new(&field.expr, project.input.row_type()))
                    .collect(),
                ident,
            });
            eval_plan(lines, &project.input, ident + 2);
        }
        PhysicalPlan::Filter(filter) => {
            eval_plan(lines, &filter.input, ident);
            lines.push(Line::Filter {
                expr: PrintExpr::new(&filter.predicate, filter.input.row_type()),
                ident: ident + 2,
            });
        }
    }
}

/// A pretty printer for physical plans
///
/// The printer will format the plan in a human-readable format, suitable for the `EXPLAIN` command.
pub struct Explain<'a> {
    plan: &'a PlanNode,
    lines: Vec<Line<'a>>,
    options: ExplainOptions,
}

impl<'a> Explain<'a> {
    pub fn new(plan: &'a PlanNode) -> Self {
        Self {
            plan,
            lines: Vec::new(),
            options: ExplainOptions::new(),
        }
    }

    /// Set the options for the printer
    pub fn with_options(mut self, options: ExplainOptions) -> Self {
        self.options = options;
        self
    }

    /// Build the `Explain` output
    pub fn build(self) -> Self {
        let mut lines = Vec::new();
        eval_plan(&mut lines, self.plan, 0);
        Self { lines, ..self }
    }
}

impl fmt::Display for PrintField<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.row.field_name(self.pos) {
            Some(name) if !name.is_empty() => write!(f, "{name}"),
            _ => write!(f, "#{}", self.pos),
        }
    }
}

impl fmt::Display for PrintExpr<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.expr {
            PhysicalExpr::Field(pos, _) => write!(f, "{}", PrintField { pos: *pos, row: self.row }),
            PhysicalExpr::Cast(expr, ty) => write!(f, "CAST({} AS {ty})", self.with(expr)),
            PhysicalExpr::IsNotNull(expr) => write!(f, "{} IS NOT NULL", self.with(expr)),
            PhysicalExpr::And(exprs) => write!(f, "{}", exprs.iter().map(|expr| self.with(expr)).join(" AND ")),
        }
    }
}

impl fmt::Display for PrintName<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrintName::Named { name } => write!(f, "{name}"),
            PrintName::Id { object, id } => write!(f, "{object} id {id}"),
        }
    }
}

impl fmt::Display for Explain<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in &self.lines {
            let ident = line.ident();
            let arrow = if ident > 0 { "-> " } else { "" };

            match line {
                Line::SemiJoin { ident: _ } => {
                    write!(f, "{:ident$}{arrow}Semi Join", "")?;
                }
                Line::JoinCond { lhs, rhs, ident: _ } => {
                    let cond = lhs.iter().zip(rhs).map(|(lhs, rhs)| format!("{lhs} = {rhs}")).join(", ");
                    write!(f, "{:ident$}Join Cond: ({cond})", "")?;
                }
                Line::TableScan { table, ident: _ } => {
                    write!(f, "{:ident$}{arrow}Table Scan on {table}", "")?;
                }
                Line::Columns { columns, ident: _ } => {
                    write!(f, "{:ident$}Columns: {}", "", columns.iter().join(", "))?;
                }
                Line::ResidualFilter { ident: _ } => {
                    write!(f, "{:ident$}Residual Filter: true", "")?;
                }
                Line::IxIntersect { ident: _ } => {
                    write!(f, "{:ident$}{arrow}Index Intersect", "")?;
                }
                Line::IxMerge { ident: _ } => {
                    write!(f, "{:ident$}{arrow}Index Merge", "")?;
                }
                Line::IxSearch { table, index, ident: _ } => {
                    write!(f, "{:ident$}{arrow}Index Search using {index} on {table}", "")?;
                }
                Line::SearchFlags {
                    unique_key,
                    outer,
                    ident: _,
                } => {
                    write!(f, "{:ident$}Unique Key: {unique_key}, Outer: {outer}", "")?;
                }
                Line::Params { params, ident: _ } => {
                    write!(
                        f,
                        "{:ident$}Start Rid: ${}, Row Limit: ${}",
                        "", params.start_rid, params.row_limit
                    )?;
                }
                Line::RidLimit { param, ident: _ } => {
                    write!(f, "{:ident$}Rid Limit: ${param}", "")?;
                }
                Line::Sort { keys, distinct, ident: _ } => {
                    let distinct = if *distinct { " (distinct)" } else { "" };
                    write!(f, "{:ident$}{arrow}Sort: {}{distinct}", "", keys.iter().join(", "))?;
                }
                Line::Project { exprs, ident: _ } => {
                    write!(f, "{:ident$}{arrow}Projection: {}", "", exprs.iter().join(", "))?;
                }
                Line::Filter { expr, ident: _ } => {
                    write!(f, "{:ident$}Filter: ({expr})", "")?;
                }
            }
            writeln!(f)?;
        }

        let row = self.plan.row_type();
        let columns = row
            .elements()
            .iter()
            .map(|elem| {
                if self.options.show_types {
                    format!("{}: {}", elem.name, elem.algebraic_type)
                } else {
                    elem.name.to_string()
                }
            })
            .join(", ");
        write!(f, "  Output: {columns}")
    }
}

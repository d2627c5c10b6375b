//! 由选中的表、列与连接来源生成 SELECT 语句文本。
//!
//! 两种连接模式：
//! - 路径搜索：每个后续表从锚点表出发在关系图上找最短路径，逐步 LEFT JOIN；
//! - 显式指定：按调用方给出的 [`JoinSpec`] 生成 JOIN，缺失的表退化为 CROSS JOIN。
//!
//! 纯函数，不做 I/O，同样的输入总是得到逐字节相同的输出。

use crate::core::quote::{qualified_column, quote_table};
use crate::core::relation_graph::RelationGraph;
use crate::models::query::{JoinSpec, Selection};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Copy)]
pub enum JoinSource<'a> {
    Graph(&'a RelationGraph),
    Explicit(&'a HashMap<String, JoinSpec>),
}

/// 选择为空时返回空串，调用方应视为“无可执行内容”而不是错误
pub fn build_query(selection: &Selection, source: JoinSource<'_>) -> String {
    let Some(anchor) = selection.anchor() else {
        return String::new();
    };

    let select_list = select_list(selection);
    // 没有任何选中列时输出 *，不拼出 "SELECT  FROM" 这种无效语句
    let columns = if select_list.is_empty() {
        "*".to_string()
    } else {
        select_list.join(", ")
    };
    let mut query = format!("SELECT {} FROM {}", columns, quote_table(anchor));

    let rest = &selection.tables[1..];
    let joins = match source {
        JoinSource::Explicit(specs) => explicit_joins(rest, specs),
        JoinSource::Graph(graph) => path_joins(anchor, rest, graph),
    };
    for clause in joins {
        query.push(' ');
        query.push_str(&clause);
    }
    query
}

fn select_list(selection: &Selection) -> Vec<String> {
    selection
        .tables
        .iter()
        .flat_map(|table| {
            selection
                .columns
                .get(table)
                .into_iter()
                .flatten()
                .map(move |column| qualified_column(table, column))
        })
        .collect()
}

fn explicit_joins(tables: &[String], specs: &HashMap<String, JoinSpec>) -> Vec<String> {
    tables
        .iter()
        .map(|table| match specs.get(table) {
            Some(spec) if spec.conditions.is_empty() => {
                format!("{} JOIN {}", spec.join_type, quote_table(table))
            }
            Some(spec) => {
                let on = spec
                    .conditions
                    .iter()
                    .map(|c| {
                        format!(
                            "{} = {}",
                            qualified_column(&spec.left_table, &c.left_column),
                            qualified_column(table, &c.right_column)
                        )
                    })
                    .collect::<Vec<_>>()
                    .join(" AND ");
                format!("{} JOIN {} ON {}", spec.join_type, quote_table(table), on)
            }
            None => format!("CROSS JOIN {}", quote_table(table)),
        })
        .collect()
}

fn path_joins(anchor: &str, tables: &[String], graph: &RelationGraph) -> Vec<String> {
    let mut used: HashSet<String> = HashSet::from([anchor.to_string()]);
    let mut clauses = Vec::new();

    for table in tables {
        // 已作为前面路径的中间表接入
        if used.contains(table) {
            continue;
        }

        let path = graph.find_path(anchor, table);
        if path.is_empty() {
            clauses.push(format!("CROSS JOIN {}", quote_table(table)));
            used.insert(table.clone());
            continue;
        }

        for step in &path {
            let from_known = used.contains(&step.from_table);
            let to_known = used.contains(&step.to_table);
            let (known, known_col, new, new_col) = match (from_known, to_known) {
                (true, false) => (
                    &step.from_table,
                    &step.from_column,
                    &step.to_table,
                    &step.to_column,
                ),
                (false, true) => (
                    &step.to_table,
                    &step.to_column,
                    &step.from_table,
                    &step.from_column,
                ),
                _ => continue,
            };
            clauses.push(format!(
                "LEFT JOIN {} ON {} = {}",
                quote_table(new),
                qualified_column(known, known_col),
                qualified_column(new, new_col)
            ));
            used.insert(new.clone());
        }
    }

    clauses
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::query::{JoinCondition, JoinType};
    use crate::models::schema::ForeignKeyRow;

    fn fk(parent: &str, parent_col: &str, referenced: &str, ref_col: &str) -> ForeignKeyRow {
        let split = |id: &str| match id.split_once('.') {
            Some((s, t)) => (Some(s.to_string()), t.to_string()),
            None => (None, id.to_string()),
        };
        let (parent_schema, parent_table) = split(parent);
        let (ref_schema, ref_table) = split(referenced);
        ForeignKeyRow {
            parent_schema,
            parent_table,
            parent_column: parent_col.to_string(),
            ref_schema,
            ref_table,
            ref_column: ref_col.to_string(),
        }
    }

    fn tables(names: &[&str]) -> Selection {
        Selection::new(names.iter().map(|n| n.to_string()).collect())
    }

    #[test]
    fn empty_selection_yields_empty_string() {
        let graph = RelationGraph::default();
        assert_eq!(build_query(&Selection::default(), JoinSource::Graph(&graph)), "");
        assert_eq!(build_query(&Selection::default(), JoinSource::Explicit(&HashMap::new())), "");
    }

    #[test]
    fn selection_without_any_columns_selects_star() {
        let graph = RelationGraph::default();
        let sql = build_query(&tables(&["A"]), JoinSource::Graph(&graph));

        assert_eq!(sql, "SELECT * FROM [A]");
        assert!(!sql.contains("SELECT  FROM"));
    }

    #[test]
    fn composite_foreign_key_joins_on_first_column_pair() {
        let graph = RelationGraph::build(&[
            fk("lines", "o_region", "orders", "region"),
            fk("lines", "o_id", "orders", "id"),
        ]);
        let sql = build_query(&tables(&["lines", "orders"]), JoinSource::Graph(&graph));

        assert_eq!(
            sql,
            "SELECT * FROM [lines] LEFT JOIN [orders] ON [lines].[o_region] = [orders].[region]"
        );
    }

    #[test]
    fn orders_customers_scenario() {
        let graph = RelationGraph::build(&[fk("Orders", "customer_id", "Customers", "id")]);
        let selection = tables(&["Orders", "Customers"])
            .with_columns("Orders", &["id", "total"])
            .with_columns("Customers", &["name"]);

        assert_eq!(
            build_query(&selection, JoinSource::Graph(&graph)),
            "SELECT [Orders].[id], [Orders].[total], [Customers].[name] FROM [Orders] \
             LEFT JOIN [Customers] ON [Orders].[customer_id] = [Customers].[id]"
        );
    }

    #[test]
    fn chain_joins_are_emitted_in_order() {
        let graph = RelationGraph::build(&[fk("B", "a_id", "A", "id"), fk("C", "b_id", "B", "id")]);
        let sql = build_query(&tables(&["A", "B", "C"]), JoinSource::Graph(&graph));

        let first = sql.find("LEFT JOIN [B] ON [A].[id] = [B].[a_id]").unwrap();
        let second = sql.find("LEFT JOIN [C] ON [B].[id] = [C].[b_id]").unwrap();
        assert!(first < second);
    }

    #[test]
    fn intermediate_tables_are_joined_once() {
        let graph = RelationGraph::build(&[fk("B", "a_id", "A", "id"), fk("C", "b_id", "B", "id")]);
        let sql = build_query(&tables(&["A", "C", "B"]), JoinSource::Graph(&graph));

        assert_eq!(
            sql,
            "SELECT * FROM [A] LEFT JOIN [B] ON [A].[id] = [B].[a_id] \
             LEFT JOIN [C] ON [B].[id] = [C].[b_id]"
        );
    }

    #[test]
    fn unrelated_table_falls_back_to_cross_join() {
        let graph = RelationGraph::build(&[fk("Orders", "customer_id", "Customers", "id")]);
        let selection = tables(&["Orders", "Audit"]).with_columns("Audit", &["at"]);
        let sql = build_query(&selection, JoinSource::Graph(&graph));

        assert_eq!(sql, "SELECT [Audit].[at] FROM [Orders] CROSS JOIN [Audit]");
        assert!(!sql.contains("JOIN [Audit] ON"));
    }

    #[test]
    fn tables_without_columns_still_join() {
        let graph = RelationGraph::build(&[fk("Orders", "customer_id", "Customers", "id")]);
        let selection = tables(&["Orders", "Customers"]).with_columns("Orders", &["id"]);
        let sql = build_query(&selection, JoinSource::Graph(&graph));

        assert!(sql.starts_with("SELECT [Orders].[id] FROM [Orders] LEFT JOIN [Customers]"));
    }

    #[test]
    fn schema_qualified_tables_are_quoted_per_segment() {
        let graph = RelationGraph::build(&[fk("dbo.Orders", "customer_id", "dbo.Customers", "id")]);
        let selection =
            tables(&["dbo.Orders", "dbo.Customers"]).with_columns("dbo.Customers", &["name"]);

        assert_eq!(
            build_query(&selection, JoinSource::Graph(&graph)),
            "SELECT [dbo].[Customers].[name] FROM [dbo].[Orders] \
             LEFT JOIN [dbo].[Customers] ON [dbo].[Orders].[customer_id] = [dbo].[Customers].[id]"
        );
    }

    #[test]
    fn output_is_deterministic_and_has_single_from() {
        let rows = [
            fk("B", "a_id", "A", "id"),
            fk("C", "a_id", "A", "id"),
            fk("D", "b_id", "B", "id"),
            fk("D", "c_id", "C", "id"),
        ];
        let selection = tables(&["A", "D", "C"]).with_columns("D", &["x", "y"]);

        let first = build_query(&selection, JoinSource::Graph(&RelationGraph::build(&rows)));
        let second = build_query(&selection, JoinSource::Graph(&RelationGraph::build(&rows)));
        assert_eq!(first, second);
        assert!(first.starts_with("SELECT "));
        assert_eq!(first.matches(" FROM ").count(), 1);
    }

    #[test]
    fn explicit_specs_with_multiple_conditions() {
        let mut specs = HashMap::new();
        specs.insert(
            "Lines".to_string(),
            JoinSpec {
                join_type: JoinType::Inner,
                left_table: "Orders".into(),
                conditions: vec![
                    JoinCondition { left_column: "id".into(), right_column: "order_id".into() },
                    JoinCondition { left_column: "region".into(), right_column: "region".into() },
                ],
            },
        );
        let selection = tables(&["Orders", "Lines"]).with_columns("Lines", &["qty"]);

        assert_eq!(
            build_query(&selection, JoinSource::Explicit(&specs)),
            "SELECT [Lines].[qty] FROM [Orders] INNER JOIN [Lines] ON \
             [Orders].[id] = [Lines].[order_id] AND [Orders].[region] = [Lines].[region]"
        );
    }

    #[test]
    fn explicit_mode_cross_joins_tables_without_spec() {
        let mut specs = HashMap::new();
        specs.insert(
            "B".to_string(),
            JoinSpec {
                join_type: JoinType::Right,
                left_table: "A".into(),
                conditions: vec![JoinCondition {
                    left_column: "id".into(),
                    right_column: "a_id".into(),
                }],
            },
        );

        assert_eq!(
            build_query(&tables(&["A", "B", "C"]), JoinSource::Explicit(&specs)),
            "SELECT * FROM [A] RIGHT JOIN [B] ON [A].[id] = [B].[a_id] CROSS JOIN [C]"
        );
    }

    #[test]
    fn explicit_spec_without_conditions_omits_on() {
        let mut specs = HashMap::new();
        specs.insert(
            "B".to_string(),
            JoinSpec { join_type: JoinType::Left, left_table: "A".into(), conditions: vec![] },
        );

        assert_eq!(
            build_query(&tables(&["A", "B"]), JoinSource::Explicit(&specs)),
            "SELECT * FROM [A] LEFT JOIN [B]"
        );
    }

    #[test]
    fn explicit_mode_ignores_graph_relations() {
        let specs = HashMap::new();
        let sql = build_query(&tables(&["Orders", "Customers"]), JoinSource::Explicit(&specs));
        assert_eq!(sql, "SELECT * FROM [Orders] CROSS JOIN [Customers]");
    }
}

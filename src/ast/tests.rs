//! Cross-cutting tests for the AST module
//!
//! These tests verify that the AST represents the statements the engine
//! issues and renders them properly in both dialects.

use super::*;

mod expr_tests {
    use super::*;

    #[test]
    fn test_column_expressions() {
        assert_eq!(render_expr(&Expr::column("id")), "\"id\"");
        assert_eq!(
            render_expr(&Expr::qualified_column("task", "createdAt")),
            "\"task\".\"createdAt\""
        );
    }

    #[test]
    fn test_literal_expressions() {
        assert_eq!(render_expr(&Expr::null()), "null");
        assert_eq!(render_expr(&Expr::bool(true)), "true");
        assert_eq!(render_expr(&Expr::int(-100)), "-100");
        assert_eq!(render_expr(&Expr::string("it's")), "'it''s'");
    }

    #[test]
    fn test_comparison_operators() {
        let ops = [
            (BinaryOperator::NotEq, "<>"),
            (BinaryOperator::LtEq, "<="),
            (BinaryOperator::GtEq, ">="),
            (BinaryOperator::IsDistinctFrom, "is distinct from"),
            (BinaryOperator::IsNotDistinctFrom, "is not distinct from"),
            (BinaryOperator::NotLike, "not like"),
        ];
        for (op, sql) in ops {
            let expr = Expr::binary(Expr::column("a"), op, Expr::int(1));
            assert_eq!(render_expr(&expr), format!("\"a\" {} 1", sql));
        }
    }

    #[test]
    fn test_in_list() {
        let expr = Expr::InList {
            expr: Box::new(Expr::column("status")),
            list: vec![Expr::string("open"), Expr::string("closed")],
            negated: true,
        };
        assert_eq!(render_expr(&expr), "\"status\" not in ('open', 'closed')");
    }

    #[test]
    fn test_same_operator_chains_flat() {
        let expr = Expr::column("a")
            .eq(Expr::int(1))
            .and(Expr::column("b").eq(Expr::int(2)))
            .and(Expr::column("c").eq(Expr::int(3)));
        assert_eq!(render_expr(&expr), "\"a\" = 1 and \"b\" = 2 and \"c\" = 3");
    }

    #[test]
    fn test_mixed_operators_parenthesized() {
        let and = Expr::column("a")
            .eq(Expr::int(1))
            .and(Expr::column("b").eq(Expr::int(2)));
        let expr = and.or(Expr::column("c").eq(Expr::int(3)));
        assert_eq!(
            render_expr(&expr),
            "(\"a\" = 1 and \"b\" = 2) or \"c\" = 3"
        );
    }

    #[test]
    fn test_not_wraps_its_operand() {
        let expr = Expr::not(Expr::column("a").or(Expr::column("b")));
        assert_eq!(render_expr(&expr), "not(\"a\" or \"b\")");
    }

    #[test]
    fn test_is_true_literal() {
        assert!(Expr::bool(true).is_true_literal());
        assert!(!Expr::bool(false).is_true_literal());
        assert!(!Expr::column("done").is_true_literal());
    }
}

mod stmt_tests {
    use super::*;

    fn subquery() -> SelectStmt {
        SelectStmt::columns(vec![SelectColumn::expr(Expr::int(1))])
            .with_from(FromClause::table("label").with_alias("l"))
            .with_where(Expr::qualified_column("l", "task_id").eq(Expr::qualified_column("t", "id")))
    }

    #[test]
    fn test_exists_and_not_exists() {
        assert_eq!(
            render_expr(&Expr::exists(subquery(), false)),
            "exists (select 1 from \"label\" \"l\" where \"l\".\"task_id\" = \"t\".\"id\")"
        );
        assert!(render_expr(&Expr::exists(subquery(), true)).starts_with("not exists ("));
    }

    #[test]
    fn test_scalar_subquery() {
        let count = SelectStmt::columns(vec![SelectColumn::expr(Expr::Aggregate(
            AggregateExpr::count_all(),
        ))])
        .with_from(FromClause::table("task"));
        assert_eq!(
            render_expr(&Expr::Subquery(Box::new(count))),
            "(select count(*) from \"task\")"
        );
    }

    #[test]
    fn test_schema_qualified_table() {
        let stmt = SelectStmt::columns(vec![SelectColumn::qualified_star("t")])
            .with_from(FromClause::table_alias(Some("app"), "task", "t"));
        assert_eq!(
            render(&Stmt::Select(stmt)),
            "select \"t\".* from \"app\".\"task\" \"t\""
        );
    }

    #[test]
    fn test_order_by_with_nulls() {
        let stmt = SelectStmt::columns(vec![SelectColumn::star()])
            .with_from(FromClause::table("task"))
            .with_order_by(vec![
                OrderByExpr::desc(Expr::column("due")).with_nulls(NullsOrder::Last),
                OrderByExpr::asc(Expr::column("id")).with_nulls(NullsOrder::Last),
            ])
            .with_limit(11)
            .with_offset(20);
        assert_eq!(
            render(&Stmt::Select(stmt)),
            "select * from \"task\" order by \"due\" desc nulls last, \"id\" asc nulls last limit 11 offset 20"
        );
    }

    #[test]
    fn test_cte_with_columns() {
        let inner = SelectStmt::columns(vec![SelectColumn::expr(Expr::column("id"))])
            .with_from(FromClause::table("task"));
        let stmt = SelectStmt::columns(vec![SelectColumn::star()])
            .with_from(FromClause::table("ids"))
            .with_ctes(vec![Cte::select("ids", inner).with_columns(vec!["task_id"])]);
        assert_eq!(
            render(&Stmt::Select(stmt)),
            "with \"ids\"(\"task_id\") as ( select \"id\" from \"task\" ) select * from \"ids\""
        );
    }
}

mod param_tests {
    use super::*;

    #[test]
    fn test_param_numbering() {
        let mut params = ParamCollector::new();
        let a = params.add(ParamValue::String("x".into()), SqlType::text());
        let b = params.add(ParamValue::Integer(7), SqlType::integer());

        let expr = Expr::column("title").eq(a).and(Expr::column("id").eq(b));
        assert_eq!(
            render_expr(&expr),
            "\"title\" = ($1::text) and \"id\" = ($2::integer)"
        );
        assert_eq!(
            render_expr_with(&expr, Dialect::Sqlite),
            "\"title\" = ?1 and \"id\" = ?2"
        );

        let params = params.into_params();
        assert_eq!(params.len(), 2);
        assert_eq!(params[1].index, 2);
        assert_eq!(params[1].value, ParamValue::Integer(7));
    }

    #[test]
    fn test_reused_param_keeps_its_index() {
        let mut params = ParamCollector::new();
        let v = params.add(ParamValue::Integer(3), SqlType::integer());
        let expr = Expr::column("a")
            .eq(v.clone())
            .or(Expr::column("b").eq(v));
        assert_eq!(
            render_expr_with(&expr, Dialect::Sqlite),
            "\"a\" = ?1 or \"b\" = ?1"
        );
        assert_eq!(params.len(), 1);
    }
}

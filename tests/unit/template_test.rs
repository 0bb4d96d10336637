use chrono::NaiveDate;
use trinodriver::template::{Value, escape, escape_identifier, format_query};

#[test]
fn test_like_pattern_keeps_percent() {
    let sql = format_query("SELECT * FROM t WHERE name LIKE ?", &["abc%".into()]);
    assert_eq!(sql, "SELECT * FROM t WHERE name LIKE 'abc%'");
}

#[test]
fn test_underscore_and_percent_never_backslashed() {
    let escaped = escape(&Value::from("100%_done"));
    assert_eq!(escaped, "'100%_done'");
    assert!(!escaped.contains('\\'));
}

#[test]
fn test_caller_like_escape_survives() {
    // The caller escaped the underscore for LIKE; it must reach the server as `\_`.
    assert_eq!(escape(&Value::from(r"a\_b")), r"'a\_b'");
    assert_eq!(escape(&Value::from(r"50\%")), r"'50\%'");
}

#[test]
fn test_quotes_remain_escaped_next_to_wildcards() {
    assert_eq!(escape(&Value::from("it's 100%")), "'it''s 100%'");
    assert_eq!(escape(&Value::from("say \"hi\"_")), r#"'say \"hi\"_'"#);
}

#[test]
fn test_injection_attempt_stays_inside_literal() {
    let sql = format_query(
        "SELECT * FROM users WHERE name = ?",
        &["' OR 1=1 --".into()],
    );
    assert_eq!(sql, "SELECT * FROM users WHERE name = ''' OR 1=1 --'");

    let sql = format_query(
        "SELECT * FROM users WHERE name = ?",
        &["x'; DROP TABLE users; --".into()],
    );
    assert_eq!(sql, "SELECT * FROM users WHERE name = 'x''; DROP TABLE users; --'");
}

#[test]
fn test_backslash_cannot_unpair_a_quote() {
    // A leading backslash must not swallow the doubled quote that follows it.
    let literal = escape(&Value::from(r"\' OR 1=1 --"));
    assert_eq!(literal, r"'\\'' OR 1=1 --'");
    let body = &literal[1..literal.len() - 1];
    assert!(!body.replace("''", "").contains('\''), "quote escaped the literal: {}", literal);
}

#[test]
fn test_plain_backslash_is_doubled() {
    assert_eq!(escape(&Value::from(r"C:\temp")), r"'C:\\temp'");
}

#[test]
fn test_control_characters() {
    assert_eq!(escape(&Value::from("a\nb\tc\rd\0e\u{1a}")), r"'a\nb\tc\rd\0e\Z'");
}

#[test]
fn test_scalar_literals() {
    assert_eq!(escape(&Value::Null), "NULL");
    assert_eq!(escape(&Value::from(true)), "true");
    assert_eq!(escape(&Value::from(false)), "false");
    assert_eq!(escape(&Value::from(42)), "42");
    assert_eq!(escape(&Value::from(-7i64)), "-7");
    assert_eq!(escape(&Value::from(1.5)), "1.5E0");
    assert_eq!(escape(&Value::from(None::<i64>)), "NULL");
    assert_eq!(escape(&Value::from(Some("x"))), "'x'");
}

#[test]
fn test_numbers_parse_back() {
    let int: i64 = escape(&Value::from(9_007_199_254_740_993i64)).parse().unwrap();
    assert_eq!(int, 9_007_199_254_740_993);
    for f in [0.1, -2.75, 123456.789, 5e-324, f64::MAX] {
        let parsed: f64 = escape(&Value::from(f)).parse().unwrap();
        assert_eq!(parsed, f);
    }
}

#[test]
fn test_extreme_floats_use_exponent_form() {
    assert_eq!(escape(&Value::from(1e300)), "1E300");
    assert_eq!(escape(&Value::from(1e-30)), "1E-30");
    assert_eq!(escape(&Value::from(-4.2e21)), "-4.2E21");
}

#[test]
fn test_non_finite_floats() {
    assert_eq!(escape(&Value::Float(f64::NAN)), "nan()");
    assert_eq!(escape(&Value::Float(f64::INFINITY)), "infinity()");
    assert_eq!(escape(&Value::Float(f64::NEG_INFINITY)), "-infinity()");
}

#[test]
fn test_date_literal() {
    let dt = NaiveDate::from_ymd_opt(2024, 3, 9)
        .unwrap()
        .and_hms_milli_opt(7, 5, 3, 42)
        .unwrap();
    assert_eq!(escape(&Value::from(dt)), "'2024-03-09 07:05:03.042'");
}

#[test]
fn test_bytes_literal() {
    assert_eq!(escape(&Value::from(vec![0x00u8, 0xab, 0x10])), "X'00ab10'");
}

#[test]
fn test_list_literal() {
    let list = Value::List(vec![1.into(), "a_b".into(), Value::Null]);
    assert_eq!(
        format_query("SELECT * FROM t WHERE id IN (?)", &[list]),
        "SELECT * FROM t WHERE id IN (1, 'a_b', NULL)"
    );

    let nested = Value::List(vec![
        Value::List(vec![1.into(), 2.into()]),
        Value::List(vec![3.into(), 4.into()]),
    ]);
    assert_eq!(escape(&nested), "(1, 2), (3, 4)");
}

#[test]
fn test_identifier_placeholder() {
    let sql = format_query("SHOW SCHEMAS FROM ??", &["analytics".into()]);
    assert_eq!(sql, "SHOW SCHEMAS FROM analytics");

    let sql = format_query("SHOW SCHEMAS FROM ?", &[Value::Identifier("analytics".into())]);
    assert_eq!(sql, "SHOW SCHEMAS FROM analytics");
}

#[test]
fn test_identifier_quoting() {
    assert_eq!(escape_identifier("hive_2"), "hive_2");
    assert_eq!(escape_identifier("my-catalog"), "\"my-catalog\"");
    assert_eq!(escape_identifier("a\"b"), "\"a\"\"b\"");
    assert_eq!(escape_identifier("1abc"), "\"1abc\"");
}

#[test]
fn test_raw_fragment_verbatim() {
    let sql = format_query(
        "SELECT * FROM t WHERE created_at > ?",
        &[Value::Raw("current_date - interval '1' day".into())],
    );
    assert_eq!(sql, "SELECT * FROM t WHERE created_at > current_date - interval '1' day");
}

#[test]
fn test_placeholders_filled_in_order() {
    let sql = format_query("SELECT ?, ?, ??", &[1.into(), "two".into(), "col".into()]);
    assert_eq!(sql, "SELECT 1, 'two', col");
}

#[test]
fn test_missing_values_leave_placeholders() {
    let sql = format_query("SELECT ? + ? FROM t WHERE x = ?", &[1.into()]);
    assert_eq!(sql, "SELECT 1 + ? FROM t WHERE x = ?");
}

#[test]
fn test_extra_values_ignored() {
    let sql = format_query("SELECT ?", &[1.into(), 2.into()]);
    assert_eq!(sql, "SELECT 1");
}

#[test]
fn test_long_question_mark_runs_untouched() {
    let sql = format_query("SELECT '???' , ?", &[5.into()]);
    assert_eq!(sql, "SELECT '???' , 5");
}

#[test]
fn test_no_values_returns_template() {
    assert_eq!(format_query("SELECT 1", &[]), "SELECT 1");
}

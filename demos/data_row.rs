use rulekit::{DataRow, Rule, Value};

fn main() {
    let rule = Rule::data_rule("Column2", "Equal", 123, "int")
        & Rule::data_rule("Column1", "NotEqual", "null", "string");
    let predicate = rulekit::compile::<DataRow>(&rule).expect("failed to compile rule");

    let mut row = DataRow::new()
        .with("Column1", "Test")
        .with("Column2", 123_i64);
    println!("initial row: {}", predicate.evaluate(&row));

    row.set("Column2", 456_i64);
    println!("Column2 = 456: {}", predicate.evaluate(&row));

    row.set("Column2", 123_i64);
    row.set("Column1", Value::Null);
    println!("Column1 = null: {}", predicate.evaluate(&row));
}

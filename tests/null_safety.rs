mod common;

use common::{order, Order, Reading};
use rulekit::{compile, CompareOp, DataRow, Literal, Reducer, Rule, Selector, Value};

fn holds(rule: &Rule, order: &Order) -> bool {
    compile::<Order>(rule).unwrap().evaluate(order)
}

fn without_country() -> Order {
    let mut order = order();
    if let Some(customer) = order.customer.as_mut() {
        customer.country = None;
    }
    order
}

#[test]
fn null_parent_makes_every_leaf_false() {
    let broken = without_country();
    for rule in [
        Rule::create("Customer.Country.CountryCode", "Equal", "AUS"),
        Rule::create("Customer.Country.CountryCode", "NotEqual", "AUS"),
        Rule::create("Customer.Country.CountryCode", "Equal", "null"),
        Rule::is_match("Customer.Country.CountryCode", "^A"),
        Rule::is_integer("Customer.Country.CountryCode"),
        Rule::method_on_child("Customer.Country.CountryCode", "StartsWith", ["A"]),
    ] {
        assert!(!holds(&rule, &broken), "{}", rule.to_json().unwrap());
    }
}

#[test]
fn null_root_member_makes_leaf_false() {
    let mut order = order();
    order.customer = None;
    assert!(!holds(
        &Rule::create("Customer.FirstName", "NotEqual", "Jane"),
        &order
    ));
}

#[test]
fn null_leaf_compares_with_lifted_semantics() {
    let mut order = order();
    order.total = None;
    assert!(holds(&Rule::create("Total", "Equal", "null"), &order));
    assert!(holds(&Rule::create("Total", "Equal", Literal::Null), &order));
    assert!(!holds(&Rule::create("Total", "NotEqual", "null"), &order));
    assert!(holds(&Rule::create("Total", "NotEqual", 5), &order));
    assert!(!holds(&Rule::create("Total", "Equal", 5), &order));
    assert!(!holds(&Rule::create("Total", "GreaterThan", 5), &order));
    assert!(!holds(&Rule::create("Total", "LessThanOrEqual", 5), &order));
}

#[test]
fn broken_path_inside_combinators() {
    let broken = without_country();
    let code = || Rule::create("Customer.Country.CountryCode", "Equal", "AUS");
    let id = || Rule::create("OrderId", "Equal", 1);

    assert!(!holds(&Rule::and([code(), id()]), &broken));
    assert!(holds(&Rule::or([code(), id()]), &broken));
    assert!(holds(&(code() | id()), &broken));
    assert!(!holds(&(id() & code()), &broken));
}

#[test]
fn quantifier_over_missing_collection_is_false() {
    let rule = Rule::any(
        "Items",
        Rule::create("ItemCode", "Equal", "MM23"),
    );
    let mut order = order();
    order.items.clear();
    assert!(!holds(&rule, &order));

    let all = Rule::all("Items", Rule::create("ItemCode", "Equal", "MM23"));
    assert!(holds(&all, &order));
}

#[test]
fn aggregate_of_empty_selection() {
    let mut order = order();
    order.items.clear();
    let count = Rule::aggregate("Items", Selector::count(), CompareOp::Eq, 0);
    assert!(holds(&count, &order));
    let max = Rule::aggregate(
        "Items",
        Selector::new("Cost", Reducer::Max),
        CompareOp::Gte,
        0,
    );
    assert!(!holds(&max, &order));
}

#[test]
fn null_string_probes_are_false() {
    let predicate = compile::<Reading>(&Rule::is_decimal("NumAsString")).unwrap();
    assert!(!predicate.evaluate(&Reading {
        num_as_string: None
    }));
}

#[test]
fn db_null_and_missing_columns() {
    let row = DataRow::new()
        .with("Column1", Value::Null)
        .with("Column2", "text");

    let equal_null = compile::<DataRow>(&Rule::data_rule("Column1", "Equal", "null", "string"))
        .unwrap();
    assert!(equal_null.evaluate(&row));

    let missing = compile::<DataRow>(&Rule::data_rule("Column9", "Equal", "null", "string"))
        .unwrap();
    assert!(!missing.evaluate(&row));

    let wrong_type = compile::<DataRow>(&Rule::data_rule("Column2", "Equal", 5, "int")).unwrap();
    assert!(!wrong_type.evaluate(&row));
}

use std::str::FromStr;
use std::sync::OnceLock;

use rulekit::{CompareOp, Record, RecordType, Reducer, Rule, Selector, Value, ValueType};
use rust_decimal::Decimal;

#[derive(Debug)]
struct Line {
    sku: String,
    price: Decimal,
}

#[derive(Debug)]
struct Cart {
    lines: Vec<Line>,
}

impl Record for Line {
    fn record_type() -> &'static RecordType {
        static TYPE: OnceLock<RecordType> = OnceLock::new();
        TYPE.get_or_init(|| {
            RecordType::builder("Line")
                .field("Sku", ValueType::String)
                .field("Price", ValueType::Decimal)
                .build()
        })
    }

    fn member(&self, name: &str) -> Option<Value<'_>> {
        match name {
            "Sku" => Some(Value::from(&self.sku)),
            "Price" => Some(Value::Decimal(self.price)),
            _ => None,
        }
    }
}

impl Record for Cart {
    fn record_type() -> &'static RecordType {
        static TYPE: OnceLock<RecordType> = OnceLock::new();
        TYPE.get_or_init(|| {
            RecordType::builder("Cart")
                .field("Lines", ValueType::list(Line::value_type()))
                .build()
        })
    }

    fn member(&self, name: &str) -> Option<Value<'_>> {
        (name == "Lines").then(|| Value::records(&self.lines))
    }
}

fn line(sku: &str, price: &str) -> Line {
    Line {
        sku: sku.into(),
        price: Decimal::from_str(price).expect("valid price"),
    }
}

fn main() {
    let cart = Cart {
        lines: vec![line("MM23", "5.25"), line("MX01", "12.00"), line("Test", "3.33")],
    };

    let rules = [
        (
            "spend on M-lines over 15",
            Rule::aggregate("Lines", Selector::sum("Price"), CompareOp::Gt, 15)
                .with_filter(Rule::method_on_child("Sku", "StartsWith", ["M"])),
        ),
        (
            "at least three lines",
            Rule::aggregate("Lines", Selector::count(), CompareOp::Gte, 3),
        ),
        (
            "cheapest line under 4",
            Rule::aggregate("Lines", Selector::new("Price", Reducer::Min), CompareOp::Lt, 4),
        ),
        (
            "every line priced",
            Rule::all("Lines", Rule::create("Price", "GreaterThan", 0)),
        ),
    ];

    for (label, rule) in rules {
        let predicate = rulekit::compile::<Cart>(&rule).expect("failed to compile rule");
        println!("{label}: {}", predicate.evaluate(&cart));
    }
}

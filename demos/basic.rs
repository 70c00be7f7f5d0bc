use std::sync::OnceLock;

use rulekit::{Record, RecordType, Rule, Value, ValueType};

#[derive(Debug)]
struct User {
    age: i64,
    status: String,
}

impl Record for User {
    fn record_type() -> &'static RecordType {
        static TYPE: OnceLock<RecordType> = OnceLock::new();
        TYPE.get_or_init(|| {
            RecordType::builder("User")
                .field("Age", ValueType::Int)
                .field("Status", ValueType::String)
                .build()
        })
    }

    fn member(&self, name: &str) -> Option<Value<'_>> {
        match name {
            "Age" => Some(Value::Int(self.age)),
            "Status" => Some(Value::from(&self.status)),
            _ => None,
        }
    }
}

fn main() {
    // Build a rule and show its wire form
    let rule = Rule::create("Age", "GreaterThanOrEqual", 18) & Rule::create("Status", "Equal", "active");
    println!("{}", rule.to_json().expect("failed to serialize rule"));

    let predicate = rulekit::compile::<User>(&rule).expect("failed to compile rule");

    for user in [
        User { age: 25, status: "active".into() },
        User { age: 16, status: "active".into() },
        User { age: 40, status: "suspended".into() },
    ] {
        println!("{user:?} -> {}", predicate.evaluate(&user));
    }
}

use std::sync::OnceLock;

use rulekit::{describe, Record, RecordType, Value, ValueType};

#[derive(Debug)]
struct Address {
    city: String,
}

#[derive(Debug)]
struct Person {
    name: String,
    age: i64,
    address: Option<Address>,
    nicknames: Vec<String>,
}

impl Record for Address {
    fn record_type() -> &'static RecordType {
        static TYPE: OnceLock<RecordType> = OnceLock::new();
        TYPE.get_or_init(|| RecordType::builder("Address").field("City", ValueType::String).build())
    }

    fn member(&self, name: &str) -> Option<Value<'_>> {
        (name == "City").then(|| Value::from(&self.city))
    }
}

impl Record for Person {
    fn record_type() -> &'static RecordType {
        static TYPE: OnceLock<RecordType> = OnceLock::new();
        TYPE.get_or_init(|| {
            RecordType::builder("Person")
                .field("Name", ValueType::String)
                .field("Age", ValueType::Int)
                .field("Address", ValueType::nullable(Address::value_type()))
                .field("Nicknames", ValueType::list(ValueType::String))
                .method("IsAdult", [], ValueType::Bool)
                .build()
        })
    }

    fn member(&self, name: &str) -> Option<Value<'_>> {
        match name {
            "Name" => Some(Value::from(&self.name)),
            "Age" => Some(Value::Int(self.age)),
            "Address" => Some(self.address.as_ref().map_or(Value::Null, |a| Value::Record(a))),
            "Nicknames" => Some(Value::list(&self.nicknames)),
            _ => None,
        }
    }

    fn invoke(&self, method: &str, _args: &[Value<'_>]) -> Option<Value<'_>> {
        (method == "IsAdult").then_some(Value::Bool(self.age >= 18))
    }
}

fn main() {
    for member in describe::<Person>() {
        let operators: Vec<_> = member.operators.iter().map(|o| o.name.as_str()).collect();
        let path = if member.path.is_empty() { "<root>" } else { member.path.as_str() };
        println!("{path} ({}): {}", member.declared_type, operators.join(", "));
    }

    let json = serde_json::to_string_pretty(&describe::<Person>()[1])
        .expect("failed to serialize descriptor");
    println!("{json}");
}

use std::sync::{Arc, OnceLock};
use std::thread;

use rulekit::{Compiler, Record, RecordType, Rule, Value, ValueType};
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
struct Request {
    user_age: i64,
    path: String,
}

impl Record for Request {
    fn record_type() -> &'static RecordType {
        static TYPE: OnceLock<RecordType> = OnceLock::new();
        TYPE.get_or_init(|| {
            RecordType::builder("Request")
                .field("UserAge", ValueType::Int)
                .field("Path", ValueType::String)
                .build()
        })
    }

    fn member(&self, name: &str) -> Option<Value<'_>> {
        match name {
            "UserAge" => Some(Value::Int(self.user_age)),
            "Path" => Some(Value::from(&self.path)),
            _ => None,
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let compiler = Arc::new(Compiler::new());
    let rule = Rule::create("UserAge", "GreaterThanOrEqual", 18) & Rule::is_match("Path", "^/api/");

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let compiler = Arc::clone(&compiler);
            let rule = rule.clone();
            thread::spawn(move || {
                // Every thread compiles; all but the first hit the cache.
                let predicate = compiler
                    .compile::<Request>(&rule)
                    .expect("failed to compile rule");
                let request = Request {
                    user_age: 16 + i64::from(i),
                    path: "/api/orders".into(),
                };
                println!("Thread {i}: {}", predicate.evaluate(&request));
            })
        })
        .collect();

    for h in handles {
        h.join().unwrap();
    }
    println!("cached predicates: {}", compiler.cached_len());
}

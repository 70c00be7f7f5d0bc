#![allow(dead_code)]

use std::str::FromStr;
use std::sync::OnceLock;

use chrono::{NaiveDate, NaiveDateTime};
use rulekit::{EnumType, EnumValue, Record, RecordType, Value, ValueType};
use rust_decimal::Decimal;

pub static STATUS: EnumType = EnumType::new("Status", &["Open", "Closed", "Cancelled"]);

#[derive(Debug, Clone)]
pub struct Country {
    pub code: String,
}

#[derive(Debug, Clone)]
pub struct Customer {
    pub first_name: String,
    pub country: Option<Country>,
}

#[derive(Debug, Clone)]
pub struct Item {
    pub code: String,
    pub cost: Decimal,
}

#[derive(Debug, Clone)]
pub struct Order {
    pub id: i64,
    pub customer: Option<Customer>,
    pub items: Vec<Item>,
    pub total: Option<Decimal>,
    pub credit_limit: Decimal,
    pub placed: NaiveDateTime,
    pub status: usize,
    pub tags: Vec<String>,
}

/// A record with a single free-text field, for the numeric probes.
#[derive(Debug, Clone)]
pub struct Reading {
    pub num_as_string: Option<String>,
}

impl Record for Country {
    fn record_type() -> &'static RecordType {
        static TYPE: OnceLock<RecordType> = OnceLock::new();
        TYPE.get_or_init(|| {
            RecordType::builder("Country")
                .field("CountryCode", ValueType::String)
                .build()
        })
    }

    fn member(&self, name: &str) -> Option<Value<'_>> {
        (name == "CountryCode").then(|| Value::from(&self.code))
    }
}

impl Record for Customer {
    fn record_type() -> &'static RecordType {
        static TYPE: OnceLock<RecordType> = OnceLock::new();
        TYPE.get_or_init(|| {
            RecordType::builder("Customer")
                .field("FirstName", ValueType::String)
                .field("Country", ValueType::nullable(Country::value_type()))
                .build()
        })
    }

    fn member(&self, name: &str) -> Option<Value<'_>> {
        match name {
            "FirstName" => Some(Value::from(&self.first_name)),
            "Country" => Some(
                self.country
                    .as_ref()
                    .map_or(Value::Null, |c| Value::Record(c)),
            ),
            _ => None,
        }
    }
}

impl Record for Item {
    fn record_type() -> &'static RecordType {
        static TYPE: OnceLock<RecordType> = OnceLock::new();
        TYPE.get_or_init(|| {
            RecordType::builder("Item")
                .field("ItemCode", ValueType::String)
                .field("Cost", ValueType::Decimal)
                .build()
        })
    }

    fn member(&self, name: &str) -> Option<Value<'_>> {
        match name {
            "ItemCode" => Some(Value::from(&self.code)),
            "Cost" => Some(Value::Decimal(self.cost)),
            _ => None,
        }
    }
}

impl Record for Order {
    fn record_type() -> &'static RecordType {
        static TYPE: OnceLock<RecordType> = OnceLock::new();
        TYPE.get_or_init(|| {
            RecordType::builder("Order")
                .field("OrderId", ValueType::Int)
                .field("Customer", ValueType::nullable(Customer::value_type()))
                .field("Items", ValueType::list(Item::value_type()))
                .field("Total", ValueType::nullable(ValueType::Decimal))
                .field("CreditLimit", ValueType::Decimal)
                .field("Placed", ValueType::DateTime)
                .field("Status", ValueType::Enum(&STATUS))
                .field("Tags", ValueType::list(ValueType::String))
                .method("HasItem", [ValueType::String], ValueType::Bool)
                .method("HasTag", [ValueType::String], ValueType::Bool)
                .build()
        })
    }

    fn member(&self, name: &str) -> Option<Value<'_>> {
        Some(match name {
            "OrderId" => Value::Int(self.id),
            "Customer" => self
                .customer
                .as_ref()
                .map_or(Value::Null, |c| Value::Record(c)),
            "Items" => Value::records(&self.items),
            "Total" => self.total.into(),
            "CreditLimit" => Value::Decimal(self.credit_limit),
            "Placed" => Value::DateTime(self.placed),
            "Status" => Value::Enum(EnumValue::new(&STATUS, self.status)),
            "Tags" => Value::list(&self.tags),
            _ => return None,
        })
    }

    fn invoke(&self, method: &str, args: &[Value<'_>]) -> Option<Value<'_>> {
        match (method, args) {
            ("HasItem", [Value::String(code)]) => {
                Some(Value::Bool(self.items.iter().any(|i| i.code == **code)))
            }
            ("HasTag", [Value::String(tag)]) => {
                Some(Value::Bool(self.tags.iter().any(|t| t == &**tag)))
            }
            _ => None,
        }
    }
}

impl Record for Reading {
    fn record_type() -> &'static RecordType {
        static TYPE: OnceLock<RecordType> = OnceLock::new();
        TYPE.get_or_init(|| {
            RecordType::builder("Reading")
                .field("NumAsString", ValueType::nullable(ValueType::String))
                .build()
        })
    }

    fn member(&self, name: &str) -> Option<Value<'_>> {
        (name == "NumAsString").then(|| self.num_as_string.as_ref().into())
    }
}

pub fn dec(text: &str) -> Decimal {
    Decimal::from_str(text).unwrap()
}

pub fn order() -> Order {
    Order {
        id: 1,
        customer: Some(Customer {
            first_name: "John".into(),
            country: Some(Country { code: "AUS".into() }),
        }),
        items: vec![
            Item {
                code: "MM23".into(),
                cost: dec("5.25"),
            },
            Item {
                code: "Test".into(),
                cost: dec("3.33"),
            },
        ],
        total: Some(dec("8.58")),
        credit_limit: dec("100"),
        placed: NaiveDate::from_ymd_opt(2024, 3, 15)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap(),
        status: 0,
        tags: vec!["priority".into(), "gift".into()],
    }
}

pub fn reading(text: &str) -> Reading {
    Reading {
        num_as_string: Some(text.to_owned()),
    }
}

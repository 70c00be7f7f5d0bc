use std::str::FromStr;
use std::sync::OnceLock;

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;

use crate::types::EnumValue;
use crate::{EnumType, Record, RecordType, Value, ValueType};

pub(crate) static STATUS: EnumType = EnumType::new("Status", &["Open", "Closed", "Cancelled"]);

#[derive(Debug, Clone)]
pub(crate) struct Country {
    pub(crate) code: String,
}

#[derive(Debug, Clone)]
pub(crate) struct Customer {
    pub(crate) first_name: String,
    pub(crate) last_name: String,
    pub(crate) country: Option<Country>,
    pub(crate) referrer: Option<Box<Customer>>,
}

#[derive(Debug, Clone)]
pub(crate) struct Item {
    pub(crate) code: String,
    pub(crate) cost: Decimal,
}

#[derive(Debug, Clone)]
pub(crate) struct Order {
    pub(crate) id: i64,
    pub(crate) customer: Option<Customer>,
    pub(crate) items: Vec<Item>,
    pub(crate) total: Option<Decimal>,
    pub(crate) date: NaiveDateTime,
    pub(crate) status: usize,
    pub(crate) codes: Vec<String>,
    pub(crate) attributes: Vec<(String, String)>,
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
        match name {
            "CountryCode" => Some(Value::from(&self.code)),
            _ => None,
        }
    }
}

impl Record for Customer {
    fn record_type() -> &'static RecordType {
        static TYPE: OnceLock<RecordType> = OnceLock::new();
        TYPE.get_or_init(|| {
            RecordType::builder("Customer")
                .field("FirstName", ValueType::String)
                .field("LastName", ValueType::String)
                .field("Country", ValueType::nullable(Country::value_type()))
                .field("Referrer", ValueType::nullable(Customer::value_type()))
                .build()
        })
    }

    fn member(&self, name: &str) -> Option<Value<'_>> {
        Some(match name {
            "FirstName" => Value::from(&self.first_name),
            "LastName" => Value::from(&self.last_name),
            "Country" => self.country.as_ref().map_or(Value::Null, |c| Value::Record(c)),
            "Referrer" => self
                .referrer
                .as_deref()
                .map_or(Value::Null, |c| Value::Record(c)),
            _ => return None,
        })
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
                .field("OrderDate", ValueType::DateTime)
                .field("Status", ValueType::Enum(&STATUS))
                .field("Codes", ValueType::list(ValueType::String))
                .field("Attributes", ValueType::map(ValueType::String, ValueType::String))
                .method("HasItem", [ValueType::String], ValueType::Bool)
                .method("HasItem", [ValueType::String, ValueType::Decimal], ValueType::Bool)
                .method("ItemCount", [], ValueType::Int)
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
            "OrderDate" => Value::DateTime(self.date),
            "Status" => Value::Enum(EnumValue::new(&STATUS, self.status)),
            "Codes" => Value::list(&self.codes),
            "Attributes" => Value::Map(
                self.attributes
                    .iter()
                    .map(|(k, v)| (Value::from(k), Value::from(v)))
                    .collect(),
            ),
            _ => return None,
        })
    }

    fn invoke(&self, method: &str, args: &[Value<'_>]) -> Option<Value<'_>> {
        match (method, args) {
            ("HasItem", [Value::String(code)]) => {
                Some(Value::Bool(self.items.iter().any(|i| i.code == **code)))
            }
            ("HasItem", [Value::String(code), Value::Decimal(min)]) => Some(Value::Bool(
                self.items.iter().any(|i| i.code == **code && i.cost >= *min),
            )),
            ("ItemCount", []) => i64::try_from(self.items.len()).ok().map(Value::Int),
            _ => None,
        }
    }
}

pub(crate) fn order() -> Order {
    order_with_id(1)
}

pub(crate) fn order_with_id(id: i64) -> Order {
    Order {
        id,
        customer: Some(Customer {
            first_name: "John".into(),
            last_name: "Smith".into(),
            country: Some(Country { code: "AUS".into() }),
            referrer: None,
        }),
        items: vec![
            Item {
                code: "MM23".into(),
                cost: Decimal::from_str("5.25").unwrap(),
            },
            Item {
                code: "Test".into(),
                cost: Decimal::from_str("3.33").unwrap(),
            },
        ],
        total: Some(Decimal::from_str("8.58").unwrap()),
        date: NaiveDate::from_ymd_opt(2024, 3, 15)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap(),
        status: 0,
        codes: vec!["A".into(), "B".into()],
        attributes: vec![("channel".into(), "web".into())],
    }
}

use std::fmt;
use std::sync::OnceLock;

use super::value::Value;
use super::value_type::{RecordRef, ValueType};

/// A host type rules can be compiled against.
///
/// Implementors describe their shape once through [`Record::record_type`]
/// and answer member reads and method calls by name at evaluation time.
///
/// ```
/// use std::sync::OnceLock;
/// use rulekit::{Record, RecordType, Value, ValueType};
///
/// #[derive(Debug)]
/// struct Point { x: i64, y: i64 }
///
/// impl Record for Point {
///     fn record_type() -> &'static RecordType {
///         static TYPE: OnceLock<RecordType> = OnceLock::new();
///         TYPE.get_or_init(|| {
///             RecordType::builder("Point")
///                 .field("X", ValueType::Int)
///                 .field("Y", ValueType::Int)
///                 .build()
///         })
///     }
///
///     fn member(&self, name: &str) -> Option<Value<'_>> {
///         match name {
///             "X" => Some(self.x.into()),
///             "Y" => Some(self.y.into()),
///             _ => None,
///         }
///     }
/// }
/// ```
pub trait Record: fmt::Debug + Send + Sync + 'static {
    /// Static description of this type's members and methods.
    fn record_type() -> &'static RecordType
    where
        Self: Sized;

    /// Declared type of an instance used as a rule root.
    fn value_type() -> ValueType
    where
        Self: Sized,
    {
        ValueType::Record(RecordRef::new(Self::record_type))
    }

    /// Read a member by name. `None` means the member does not exist on this
    /// instance; a present-but-null member is `Some(Value::Null)`.
    fn member(&self, name: &str) -> Option<Value<'_>>;

    /// Invoke a method declared in [`Record::record_type`].
    fn invoke(&self, method: &str, args: &[Value<'_>]) -> Option<Value<'_>> {
        let _ = (method, args);
        None
    }
}

/// A method a rule may call by name.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodInfo {
    pub name: String,
    pub params: Vec<ValueType>,
    pub returns: ValueType,
}

/// Member and method descriptor for a [`Record`] type.
#[derive(Debug)]
pub struct RecordType {
    name: String,
    fields: Vec<(String, ValueType)>,
    methods: Vec<MethodInfo>,
}

/// Builder for [`RecordType`].
#[derive(Debug)]
pub struct RecordTypeBuilder {
    inner: RecordType,
}

impl RecordType {
    #[must_use]
    pub fn builder(name: &str) -> RecordTypeBuilder {
        RecordTypeBuilder {
            inner: RecordType {
                name: name.to_owned(),
                fields: Vec::new(),
                methods: Vec::new(),
            },
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared type of a field or property, matched case-sensitively.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&ValueType> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, ty)| ty)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &ValueType)> {
        self.fields.iter().map(|(name, ty)| (name.as_str(), ty))
    }

    pub fn methods(&self) -> impl Iterator<Item = &MethodInfo> {
        self.methods.iter()
    }

    pub fn methods_named<'s>(&'s self, name: &'s str) -> impl Iterator<Item = &'s MethodInfo> {
        self.methods.iter().filter(move |m| m.name == name)
    }
}

impl RecordTypeBuilder {
    #[must_use]
    pub fn field(mut self, name: &str, ty: ValueType) -> Self {
        self.inner.fields.push((name.to_owned(), ty));
        self
    }

    #[must_use]
    pub fn method(
        mut self,
        name: &str,
        params: impl IntoIterator<Item = ValueType>,
        returns: ValueType,
    ) -> Self {
        self.inner.methods.push(MethodInfo {
            name: name.to_owned(),
            params: params.into_iter().collect(),
            returns,
        });
        self
    }

    #[must_use]
    pub fn build(self) -> RecordType {
        self.inner
    }
}

/// A schema-less, string-keyed row.
///
/// Rows are queried with [`Rule::data_rule`](crate::Rule::data_rule), which
/// carries each column's declared type. A column holding [`Value::Null`] is
/// distinct from a column that does not exist.
#[derive(Debug, Clone, Default)]
pub struct DataRow {
    cells: Vec<(String, Value<'static>)>,
}

impl DataRow {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a column, returning the row for chaining.
    #[must_use]
    pub fn with(mut self, column: &str, value: impl Into<Value<'static>>) -> Self {
        self.set(column, value);
        self
    }

    pub fn set(&mut self, column: &str, value: impl Into<Value<'static>>) {
        let value = value.into();
        match self.cells.iter_mut().find(|(name, _)| name == column) {
            Some((_, cell)) => *cell = value,
            None => self.cells.push((column.to_owned(), value)),
        }
    }

    #[must_use]
    pub fn get(&self, column: &str) -> Option<&Value<'static>> {
        self.cells
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, cell)| cell)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl Record for DataRow {
    fn record_type() -> &'static RecordType {
        static TYPE: OnceLock<RecordType> = OnceLock::new();
        TYPE.get_or_init(|| RecordType::builder("DataRow").build())
    }

    fn value_type() -> ValueType {
        ValueType::Row
    }

    fn member(&self, name: &str) -> Option<Value<'_>> {
        self.get(name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_collects_fields_and_methods() {
        let ty = RecordType::builder("Order")
            .field("OrderId", ValueType::Int)
            .field("Total", ValueType::nullable(ValueType::Decimal))
            .method("HasItem", [ValueType::String], ValueType::Bool)
            .build();

        assert_eq!(ty.name(), "Order");
        assert_eq!(ty.field("OrderId"), Some(&ValueType::Int));
        assert_eq!(ty.field("orderid"), None);
        assert_eq!(ty.fields().count(), 2);
        let has_item: Vec<_> = ty.methods_named("HasItem").collect();
        assert_eq!(has_item.len(), 1);
        assert_eq!(has_item[0].params, vec![ValueType::String]);
    }

    #[test]
    fn data_row_null_is_not_absent() {
        let row = DataRow::new()
            .with("Column1", "Test")
            .with("Column2", Value::Null);
        assert_eq!(row.member("Column2"), Some(Value::Null));
        assert_eq!(row.member("Column3"), None);
        assert_eq!(row.len(), 2);
    }

    #[test]
    fn data_row_set_overwrites() {
        let mut row = DataRow::new().with("Column2", 123_i64);
        row.set("Column2", 456_i64);
        assert_eq!(row.get("Column2"), Some(&Value::Int(456)));
        assert_eq!(row.len(), 1);
    }

    #[test]
    fn data_row_is_a_row_type() {
        assert_eq!(DataRow::value_type(), ValueType::Row);
    }
}

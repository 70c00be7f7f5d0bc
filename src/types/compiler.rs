use std::any::{Any, TypeId};
use std::fmt;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, LazyLock};

use chrono::NaiveDateTime;
use dashmap::DashMap;
use tracing::{debug, instrument, trace, warn};

use super::error::RuleError;
use super::record::Record;
use super::rule::Rule;
use super::value::Value;
use super::value_type::ValueType;
use crate::compile::{self, Node, Options};

/// Default cap on the compiled size of an `IsMatch` pattern.
pub const DEFAULT_REGEX_SIZE_LIMIT: usize = 10 * (1 << 20);

/// Default cap on rule nesting.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Default number of compiled predicates a [`Compiler`] keeps.
pub const DEFAULT_CACHE_CAPACITY: usize = 1024;

static DEFAULT: LazyLock<Compiler> = LazyLock::new(Compiler::new);

/// Builder for constructing a [`Compiler`].
///
/// # Example
///
/// ```
/// use rulekit::CompilerBuilder;
///
/// let compiler = CompilerBuilder::new()
///     .max_depth(16)
///     .cache(false)
///     .build();
/// assert_eq!(compiler.cached_len(), 0);
/// ```
#[derive(Debug, Clone)]
pub struct CompilerBuilder {
    regex_size_limit: usize,
    max_depth: usize,
    reference_time: Option<NaiveDateTime>,
    cache: bool,
    cache_capacity: usize,
}

impl Default for CompilerBuilder {
    fn default() -> Self {
        Self {
            regex_size_limit: DEFAULT_REGEX_SIZE_LIMIT,
            max_depth: DEFAULT_MAX_DEPTH,
            reference_time: None,
            cache: true,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

impl CompilerBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Upper bound, in bytes, on a compiled `IsMatch` regex.
    #[must_use]
    pub fn regex_size_limit(mut self, bytes: usize) -> Self {
        self.regex_size_limit = bytes;
        self
    }

    /// Deepest rule nesting accepted before compilation fails with
    /// [`RuleError::BadRuleShape`].
    #[must_use]
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Pin the instant `#NOW` literals are computed from. Without it the
    /// local clock is read once per compilation.
    #[must_use]
    pub fn reference_time(mut self, now: NaiveDateTime) -> Self {
        self.reference_time = Some(now);
        self
    }

    /// Reuse compiled predicates for equal `(type, rule)` pairs.
    #[must_use]
    pub fn cache(mut self, enabled: bool) -> Self {
        self.cache = enabled;
        self
    }

    /// Most compiled predicates kept at once. When full, the least recently
    /// used quarter is evicted. Zero stores nothing.
    #[must_use]
    pub fn cache_capacity(mut self, entries: usize) -> Self {
        self.cache_capacity = entries;
        self
    }

    #[must_use]
    pub fn build(self) -> Compiler {
        Compiler {
            cache: (self.cache && self.cache_capacity > 0).then(DashMap::new),
            clock: AtomicU64::new(0),
            settings: self,
        }
    }
}

/// Turns [`Rule`] trees into reusable predicates.
///
/// A `Compiler` is `Send + Sync`; share one behind an `Arc` or use the free
/// [`compile`](crate::compile()) functions, which go through
/// [`Compiler::global`].
pub struct Compiler {
    settings: CompilerBuilder,
    cache: Option<DashMap<(TypeId, Rule), Cached>>,
    clock: AtomicU64,
}

struct Cached {
    node: Arc<Node>,
    last_used: AtomicU64,
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Compiler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Compiler")
            .field("settings", &self.settings)
            .field("cached", &self.cached_len())
            .finish()
    }
}

impl Compiler {
    #[must_use]
    pub fn new() -> Self {
        CompilerBuilder::new().build()
    }

    #[must_use]
    pub fn builder() -> CompilerBuilder {
        CompilerBuilder::new()
    }

    /// The process-wide instance behind the free [`compile`](crate::compile()),
    /// [`compile_dyn`] and [`compile_json`] functions.
    #[must_use]
    pub fn global() -> &'static Compiler {
        &DEFAULT
    }

    /// Compile `rule` into a predicate over `T`.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError`] when a member, method or enum variant cannot be
    /// found on `T`, a literal cannot be coerced, or the rule is malformed.
    #[instrument(level = "debug", skip_all, fields(ty = T::record_type().name()))]
    pub fn compile<T: Record>(&self, rule: &Rule) -> Result<Predicate<T>, RuleError> {
        let node = self.node(&TypeHandle::of::<T>(), rule)?;
        Ok(Predicate {
            node,
            _marker: PhantomData,
        })
    }

    /// Compile several rules that must all hold, combined with `And`.
    ///
    /// # Errors
    ///
    /// As [`Compiler::compile`]; an empty slice is [`RuleError::BadRuleShape`].
    pub fn compile_all<T: Record>(&self, rules: &[Rule]) -> Result<Predicate<T>, RuleError> {
        self.compile(&Rule::and(rules.iter().cloned()))
    }

    /// Compile against a type known only at runtime.
    ///
    /// # Errors
    ///
    /// As [`Compiler::compile`].
    #[instrument(level = "debug", skip_all, fields(ty = handle.name))]
    pub fn compile_dyn(&self, handle: &TypeHandle, rule: &Rule) -> Result<DynPredicate, RuleError> {
        let node = self.node(handle, rule)?;
        Ok(DynPredicate {
            node,
            handle: *handle,
        })
    }

    /// Resolve the member `rule` reads on `T` and return its declared type,
    /// without compiling the rest of the rule. A data rule resolves its
    /// column against the declared type name; anything else walks the
    /// member path.
    ///
    /// # Errors
    ///
    /// [`RuleError::MemberNotFound`], [`RuleError::NotIndexable`] or
    /// [`RuleError::PathSyntax`] for a bad path, and
    /// [`RuleError::BadRuleShape`] for a data rule off a `DataRow` or a
    /// plain path on one.
    pub fn member_type<T: Record>(&self, rule: &Rule) -> Result<ValueType, RuleError> {
        self.member_type_dyn(&TypeHandle::of::<T>(), rule)
    }

    /// [`Compiler::member_type`] for a type known only at runtime.
    ///
    /// # Errors
    ///
    /// As [`Compiler::member_type`].
    pub fn member_type_dyn(&self, handle: &TypeHandle, rule: &Rule) -> Result<ValueType, RuleError> {
        compile::member_type(rule, &(handle.value_type)(), &self.options())
    }

    /// Number of compiled predicates held in the cache.
    #[must_use]
    pub fn cached_len(&self) -> usize {
        self.cache.as_ref().map_or(0, DashMap::len)
    }

    pub fn clear_cache(&self) {
        if let Some(cache) = &self.cache {
            cache.clear();
        }
    }

    fn node(&self, handle: &TypeHandle, rule: &Rule) -> Result<Arc<Node>, RuleError> {
        // Unpinned `#NOW` literals depend on the compile instant.
        let cache = self
            .cache
            .as_ref()
            .filter(|_| self.settings.reference_time.is_some() || !rule.has_relative_time());

        let key = (handle.id, rule.clone());
        if let Some(hit) = cache.and_then(|c| c.get(&key)) {
            trace!("cache hit");
            hit.last_used.store(self.tick(), Ordering::Relaxed);
            return Ok(Arc::clone(&hit.node));
        }

        let node = match compile::compile(rule, &(handle.value_type)(), &self.options()) {
            Ok(node) => Arc::new(node),
            Err(error) => {
                warn!(%error, "rule failed to compile");
                return Err(error);
            }
        };
        debug!(nodes = node.size(), "compiled rule");

        if let Some(cache) = cache {
            trace!("cache miss, storing");
            cache.insert(
                key,
                Cached {
                    node: Arc::clone(&node),
                    last_used: AtomicU64::new(self.tick()),
                },
            );
            if cache.len() > self.settings.cache_capacity {
                evict_least_recent(cache);
            }
        }
        Ok(node)
    }

    fn options(&self) -> Options {
        Options {
            regex_size_limit: self.settings.regex_size_limit,
            max_depth: self.settings.max_depth,
            now: self
                .settings
                .reference_time
                .unwrap_or_else(|| chrono::Local::now().naive_local()),
        }
    }

    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed)
    }
}

/// Drop the least recently used quarter of `cache`, at least one entry.
fn evict_least_recent(cache: &DashMap<(TypeId, Rule), Cached>) {
    let mut candidates: Vec<_> = cache
        .iter()
        .map(|entry| (entry.key().clone(), entry.last_used.load(Ordering::Relaxed)))
        .collect();
    candidates.sort_unstable_by_key(|(_, last_used)| *last_used);

    let target = (candidates.len() / 4).max(1);
    for (key, _) in candidates.into_iter().take(target) {
        cache.remove(&key);
    }
    debug!(evicted = target, "compiled rule cache full");
}

/// Runtime description of a [`Record`] type, for [`Compiler::compile_dyn`].
#[derive(Clone, Copy)]
pub struct TypeHandle {
    id: TypeId,
    name: &'static str,
    value_type: fn() -> ValueType,
    cast: fn(&dyn Any) -> Option<&dyn Record>,
}

impl TypeHandle {
    #[must_use]
    pub fn of<T: Record>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: T::record_type().name(),
            value_type: T::value_type,
            cast: cast::<T>,
        }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Debug for TypeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TypeHandle").field(&self.name).finish()
    }
}

fn cast<T: Record>(instance: &dyn Any) -> Option<&dyn Record> {
    instance.downcast_ref::<T>().map(|r| r as &dyn Record)
}

/// A compiled rule over `T`. Cheap to clone and safe to share across threads.
pub struct Predicate<T> {
    node: Arc<Node>,
    _marker: PhantomData<fn(&T) -> bool>,
}

impl<T: Record> Predicate<T> {
    #[must_use]
    pub fn evaluate(&self, instance: &T) -> bool {
        crate::evaluate::evaluate(&self.node, &Value::Record(instance))
    }

    /// Detach the predicate as a plain closure, e.g. for `Iterator::filter`.
    pub fn into_fn(self) -> impl Fn(&T) -> bool + Clone + Send + Sync + 'static {
        move |instance: &T| self.evaluate(instance)
    }
}

impl<T> Clone for Predicate<T> {
    fn clone(&self) -> Self {
        Self {
            node: Arc::clone(&self.node),
            _marker: PhantomData,
        }
    }
}

impl<T> fmt::Debug for Predicate<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Predicate")
            .field("type", &std::any::type_name::<T>())
            .field("nodes", &self.node.size())
            .finish()
    }
}

/// A compiled rule over a type chosen at runtime.
#[derive(Clone)]
pub struct DynPredicate {
    node: Arc<Node>,
    handle: TypeHandle,
}

impl DynPredicate {
    /// # Errors
    ///
    /// Returns [`RuleError::TypeMismatch`] if `instance` is not of the type
    /// this predicate was compiled for.
    pub fn evaluate(&self, instance: &dyn Any) -> Result<bool, RuleError> {
        let record = (self.handle.cast)(instance).ok_or_else(|| RuleError::TypeMismatch {
            expected: self.handle.name.to_owned(),
        })?;
        Ok(crate::evaluate::evaluate(&self.node, &Value::Record(record)))
    }

    #[must_use]
    pub fn type_handle(&self) -> &TypeHandle {
        &self.handle
    }
}

impl fmt::Debug for DynPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynPredicate")
            .field("type", &self.handle.name)
            .field("nodes", &self.node.size())
            .finish()
    }
}

/// Compile `rule` for `T` with the process-wide default [`Compiler`].
///
/// # Errors
///
/// See [`Compiler::compile`].
pub fn compile<T: Record>(rule: &Rule) -> Result<Predicate<T>, RuleError> {
    DEFAULT.compile(rule)
}

/// Type-erased [`compile`] with the process-wide default [`Compiler`].
///
/// # Errors
///
/// See [`Compiler::compile`].
pub fn compile_dyn(handle: &TypeHandle, rule: &Rule) -> Result<DynPredicate, RuleError> {
    DEFAULT.compile_dyn(handle, rule)
}

/// Parse a JSON rule document and compile it for `T`.
///
/// # Errors
///
/// Returns [`RulekitError::Json`](crate::RulekitError::Json) for a malformed
/// document and [`RulekitError::Rule`](crate::RulekitError::Rule) when the
/// rule does not compile.
pub fn compile_json<T: Record>(json: &str) -> Result<Predicate<T>, crate::RulekitError> {
    let rule = Rule::from_json(json)?;
    Ok(compile(&rule)?)
}

/// Declared type of the member `rule` reads on `T`.
///
/// # Errors
///
/// See [`Compiler::member_type`].
pub fn member_type<T: Record>(rule: &Rule) -> Result<ValueType, RuleError> {
    DEFAULT.member_type::<T>(rule)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{self, Order};
    use crate::DataRow;

    fn pinned() -> Compiler {
        CompilerBuilder::new()
            .reference_time(chrono::NaiveDate::default().and_time(chrono::NaiveTime::MIN))
            .build()
    }

    #[test]
    fn equal_rules_share_a_compiled_tree() {
        let compiler = pinned();
        let rule = Rule::create("OrderId", "Equal", 1);
        let a = compiler.compile::<Order>(&rule).unwrap();
        let b = compiler.compile::<Order>(&rule.clone()).unwrap();
        assert!(Arc::ptr_eq(&a.node, &b.node));
        assert_eq!(compiler.cached_len(), 1);
        compiler.clear_cache();
        assert_eq!(compiler.cached_len(), 0);
    }

    #[test]
    fn cache_is_keyed_by_type() {
        let compiler = pinned();
        let rule = Rule::data_rule("OrderId", "Equal", 1, "int");
        assert!(compiler.compile::<Order>(&rule).is_err());
        assert!(compiler.compile::<DataRow>(&rule).is_ok());
        assert_eq!(compiler.cached_len(), 1);
    }

    #[test]
    fn unpinned_relative_time_bypasses_cache() {
        let compiler = Compiler::new();
        let rule = Rule::create("OrderDate", "GreaterThan", "#NOW-1D");
        compiler.compile::<Order>(&rule).unwrap();
        assert_eq!(compiler.cached_len(), 0);
    }

    #[test]
    fn disabled_cache() {
        let compiler = CompilerBuilder::new().cache(false).build();
        compiler
            .compile::<Order>(&Rule::create("OrderId", "Equal", 1))
            .unwrap();
        assert_eq!(compiler.cached_len(), 0);
    }

    #[test]
    fn cache_capacity_bounds_entries() {
        let compiler = CompilerBuilder::new().cache_capacity(8).build();
        for id in 0..100 {
            compiler
                .compile::<Order>(&Rule::create("OrderId", "Equal", id))
                .unwrap();
            assert!(compiler.cached_len() <= 8);
        }
        assert!(compiler.cached_len() > 0);
    }

    #[test]
    fn eviction_keeps_recently_used_rules() {
        let compiler = CompilerBuilder::new().cache_capacity(4).build();
        let rule = |id: i64| Rule::create("OrderId", "Equal", id);
        let kept = compiler.compile::<Order>(&rule(0)).unwrap();
        for id in 1..4 {
            compiler.compile::<Order>(&rule(id)).unwrap();
        }
        compiler.compile::<Order>(&rule(0)).unwrap();
        compiler.compile::<Order>(&rule(4)).unwrap();
        assert_eq!(compiler.cached_len(), 4);

        let again = compiler.compile::<Order>(&rule(0)).unwrap();
        assert!(Arc::ptr_eq(&kept.node, &again.node));
        let evicted = compiler.compile::<Order>(&rule(1)).unwrap();
        assert_eq!(compiler.cached_len(), 4);
        assert!(evicted.evaluate(&fixtures::order()));
    }

    #[test]
    fn zero_capacity_stores_nothing() {
        let compiler = CompilerBuilder::new().cache_capacity(0).build();
        compiler
            .compile::<Order>(&Rule::create("OrderId", "Equal", 1))
            .unwrap();
        assert_eq!(compiler.cached_len(), 0);
    }

    #[test]
    fn member_type_resolves_without_compiling() {
        let compiler = pinned();
        assert_eq!(
            compiler
                .member_type::<Order>(&Rule::create("Customer.FirstName", "Equal", "Jane"))
                .unwrap(),
            ValueType::String
        );
        assert_eq!(
            compiler
                .member_type::<DataRow>(&Rule::data_rule("Column2", "Equal", 123, "int"))
                .unwrap(),
            ValueType::Int
        );
        assert_eq!(compiler.cached_len(), 0);
    }

    #[test]
    fn compile_all_requires_every_rule() {
        let order = fixtures::order();
        let compiler = pinned();
        let pass = compiler
            .compile_all::<Order>(&[
                Rule::create("OrderId", "Equal", 1),
                Rule::create("Customer.FirstName", "Equal", "John"),
            ])
            .unwrap();
        assert!(pass.evaluate(&order));
        let fail = compiler
            .compile_all::<Order>(&[
                Rule::create("OrderId", "Equal", 1),
                Rule::create("Customer.FirstName", "Equal", "Jane"),
            ])
            .unwrap();
        assert!(!fail.evaluate(&order));
        assert!(compiler.compile_all::<Order>(&[]).is_err());
    }

    #[test]
    fn dyn_predicate_checks_input_type() {
        let order = fixtures::order();
        let predicate = pinned()
            .compile_dyn(&TypeHandle::of::<Order>(), &Rule::create("OrderId", "Equal", 1))
            .unwrap();
        assert_eq!(predicate.evaluate(&order), Ok(true));
        assert_eq!(
            predicate.evaluate(&DataRow::new()),
            Err(RuleError::TypeMismatch {
                expected: "Order".into()
            })
        );
    }

    #[test]
    fn into_fn_filters() {
        let orders = [fixtures::order(), fixtures::order_with_id(2)];
        let keep = pinned()
            .compile::<Order>(&Rule::create("OrderId", "GreaterThan", 1))
            .unwrap()
            .into_fn();
        assert_eq!(orders.iter().filter(|o| keep(*o)).count(), 1);
    }
}

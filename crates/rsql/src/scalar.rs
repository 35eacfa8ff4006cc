//! Scalar Values (§4.11): `ColumnValue`, `RowValue`, `MapValue` — single
//! cell/row reactive wrappers over a view, typically the tip of a
//! `.count()`/`.sum()`/`.only()` chain rather than something users
//! subscribe to a full `View` for.
//!
//! Each holds a [`ParentLink`] to the view it was built over, exactly
//! the way a derived view holds one to its parent (§9 "ownership
//! problem") — dropping the last strong handle to a `ColumnValue` or
//! `RowValue` drops its `ParentLink`, which unregisters from the
//! parent's listener lists automatically, so there is nothing extra to
//! clean up. `MapValue` chains onto its source the same way, just one
//! level removed: it owns the source scalar value outright rather than
//! the view it ultimately traces back to.

use std::cell::RefCell;
use std::rc::Rc;

use rsql_core::{Error, Result, Row, Value};
use rsql_reactive::listeners::{ListenerList, Subscription};
use rsql_reactive::{Delta, ParentLink, ViewSubscription};

use crate::view::{self, View, ViewRef};

fn read_current_value(view: &ViewRef, column: usize) -> Result<Value> {
    let rows = view::fetchall(view)?;
    Ok(match rows.into_iter().next() {
        Some(row) => row.get(column).cloned().unwrap_or(Value::Null),
        None => Value::Null,
    })
}

fn read_current_row(view: &ViewRef) -> Result<Option<Row>> {
    let rows = view::fetchall(view)?;
    Ok(rows.into_iter().next().map(|r| r.into_row()))
}

/// A single scalar tracked off a view — typically a one-row, one-column
/// `GroupBy` such as `.count()`/`.sum(col)` (§4.11).
pub struct ColumnValue {
    #[allow(dead_code)]
    parent_link: ParentLink<View, ViewSubscription>,
    current: Rc<RefCell<Value>>,
    onchange: Rc<RefCell<ListenerList<Value>>>,
}

impl ColumnValue {
    /// `View.count()`/`.sum(col)`/etc construct a `ColumnValue` over
    /// their own one-row, one-column `GroupBy`; this is the general
    /// constructor any single column of any view can use.
    pub fn new(parent: &ViewRef, column_name: &str) -> Result<Self> {
        let column = {
            let p = parent.borrow();
            p.columns
                .iter()
                .position(|c| c == column_name)
                .ok_or_else(|| Error::usage(format!("ColumnValue: unknown column {column_name}")))?
        };

        let current = Rc::new(RefCell::new(read_current_value(parent, column)?));
        let onchange: Rc<RefCell<ListenerList<Value>>> = Rc::new(RefCell::new(ListenerList::new()));

        let parent_weak = Rc::downgrade(parent);
        let current_for_closure = current.clone();
        let onchange_for_closure = onchange.clone();

        let parent_link = view::link_to_parent(parent, move |delta: Delta<Row>| {
            let new_value = match &delta {
                Delta::Insert(row) => row.get(column).cloned().unwrap_or(Value::Null),
                Delta::Update { new, .. } => new.get(column).cloned().unwrap_or(Value::Null),
                Delta::Delete(_) => Value::Null,
                Delta::Reset => parent_weak
                    .upgrade()
                    .and_then(|view| read_current_value(&view, column).ok())
                    .unwrap_or(Value::Null),
            };
            *current_for_closure.borrow_mut() = new_value.clone();
            onchange_for_closure.borrow_mut().notify(&new_value);
        });

        Ok(Self { parent_link, current, onchange })
    }

    /// The value as of the last delta this `ColumnValue` observed.
    pub fn value(&self) -> Value {
        self.current.borrow().clone()
    }

    /// Subscribes `f` to be called with the new value every time it
    /// changes (§4.11).
    pub fn onchange(&self, f: impl FnMut(&Value) + 'static) -> Subscription {
        self.onchange.borrow_mut().subscribe(f)
    }

    /// Like [`Self::onchange`], but also calls `f` once immediately
    /// with the current value (§4.11).
    pub fn onvalue(&self, mut f: impl FnMut(&Value) + 'static) -> Subscription {
        let current = self.current.borrow().clone();
        f(&current);
        self.onchange(f)
    }

    pub fn unsubscribe_onchange(&self, subscription: Subscription) -> bool {
        self.onchange.borrow_mut().unsubscribe(subscription)
    }

    /// Builds a `MapValue` that eagerly recomputes `f(value)` every
    /// time this `ColumnValue` changes, consuming `self` so the
    /// returned `MapValue` is the sole owner of the chain down to the
    /// underlying view.
    pub fn map(self, f: impl Fn(&Value) -> Value + 'static) -> MapValue {
        MapValue::chained(MapSource::Column(self), f)
    }
}

/// The single-row contents of a parent view (§4.11, `.only()`). Useful
/// over a 1-row `GroupBy` (e.g. empty-key aggregates) or any view a
/// caller knows is at most one row.
pub struct RowValue {
    #[allow(dead_code)]
    parent_link: ParentLink<View, ViewSubscription>,
    current: Rc<RefCell<Option<Row>>>,
    onchange: Rc<RefCell<ListenerList<Option<Row>>>>,
}

impl RowValue {
    pub fn new(parent: &ViewRef) -> Result<Self> {
        let current = Rc::new(RefCell::new(read_current_row(parent)?));
        let onchange: Rc<RefCell<ListenerList<Option<Row>>>> = Rc::new(RefCell::new(ListenerList::new()));

        let parent_weak = Rc::downgrade(parent);
        let current_for_closure = current.clone();
        let onchange_for_closure = onchange.clone();

        let parent_link = view::link_to_parent(parent, move |delta: Delta<Row>| {
            let new_value = match &delta {
                Delta::Insert(row) => Some(row.clone()),
                Delta::Update { new, .. } => Some(new.clone()),
                Delta::Delete(_) => None,
                Delta::Reset => parent_weak.upgrade().and_then(|view| read_current_row(&view).ok()).flatten(),
            };
            *current_for_closure.borrow_mut() = new_value.clone();
            onchange_for_closure.borrow_mut().notify(&new_value);
        });

        Ok(Self { parent_link, current, onchange })
    }

    pub fn value(&self) -> Option<Row> {
        self.current.borrow().clone()
    }

    pub fn onchange(&self, f: impl FnMut(&Option<Row>) + 'static) -> Subscription {
        self.onchange.borrow_mut().subscribe(f)
    }

    pub fn onvalue(&self, mut f: impl FnMut(&Option<Row>) + 'static) -> Subscription {
        let current = self.current.borrow().clone();
        f(&current);
        self.onchange(f)
    }

    pub fn unsubscribe_onchange(&self, subscription: Subscription) -> bool {
        self.onchange.borrow_mut().unsubscribe(subscription)
    }
}

/// `View.only()` (§6): the single-row contents of `view`.
pub fn only(view: &ViewRef) -> Result<RowValue> {
    RowValue::new(view)
}

/// What a `MapValue` was built over — either a `ColumnValue` straight
/// off a view, or another `MapValue` (so `.map(f).map(g)` chains freely).
enum MapSource {
    Column(ColumnValue),
    Map(Box<MapValue>),
}

impl MapSource {
    fn value(&self) -> Value {
        match self {
            MapSource::Column(c) => c.value(),
            MapSource::Map(m) => m.value(),
        }
    }

    fn onchange(&self, f: impl FnMut(&Value) + 'static) -> Subscription {
        match self {
            MapSource::Column(c) => c.onchange(f),
            MapSource::Map(m) => m.onchange(f),
        }
    }
}

/// A lazy projection of a `ColumnValue` (or another `MapValue`)
/// through a pure function `f` (§4.11). Recomputes eagerly whenever the
/// source notifies, and forwards its own `onchange` to whoever
/// subscribed to the map.
pub struct MapValue {
    _source: MapSource,
    current: Rc<RefCell<Value>>,
    onchange: Rc<RefCell<ListenerList<Value>>>,
}

impl MapValue {
    fn chained(source: MapSource, f: impl Fn(&Value) -> Value + 'static) -> Self {
        let initial = f(&source.value());
        let current = Rc::new(RefCell::new(initial));
        let onchange: Rc<RefCell<ListenerList<Value>>> = Rc::new(RefCell::new(ListenerList::new()));

        let current_for_closure = current.clone();
        let onchange_for_closure = onchange.clone();
        source.onchange(move |v: &Value| {
            let mapped = f(v);
            *current_for_closure.borrow_mut() = mapped.clone();
            onchange_for_closure.borrow_mut().notify(&mapped);
        });

        Self { _source: source, current, onchange }
    }

    pub fn value(&self) -> Value {
        self.current.borrow().clone()
    }

    pub fn onchange(&self, f: impl FnMut(&Value) + 'static) -> Subscription {
        self.onchange.borrow_mut().subscribe(f)
    }

    pub fn onvalue(&self, mut f: impl FnMut(&Value) + 'static) -> Subscription {
        let current = self.current.borrow().clone();
        f(&current);
        self.onchange(f)
    }

    pub fn unsubscribe_onchange(&self, subscription: Subscription) -> bool {
        self.onchange.borrow_mut().unsubscribe(subscription)
    }

    /// Chains a further projection onto this one.
    pub fn map(self, f: impl Fn(&Value) -> Value + 'static) -> MapValue {
        MapValue::chained(MapSource::Map(Box::new(self)), f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rsql_core::schema::TableBuilder;
    use rsql_core::DataType;
    use rsql_gateway::GatewayConfig;

    fn orders_table() -> rsql_core::schema::Table {
        TableBuilder::new("orders")
            .unwrap()
            .add_column("id", DataType::Integer)
            .unwrap()
            .add_column("amount", DataType::Integer)
            .unwrap()
            .add_primary_key("id")
            .unwrap()
            .build()
            .unwrap()
    }

    #[test]
    fn test_column_value_tracks_count() {
        let gateway = Rc::new(rsql_gateway::StoreGateway::open_in_memory(GatewayConfig::in_memory()).unwrap());
        let orders = crate::view::base_table::open(&gateway, orders_table()).unwrap();
        let count = view::count(&orders).unwrap();
        assert_eq!(count.value(), Value::Integer(0));

        view::insert(&orders, &[Value::Integer(1), Value::Integer(10)]).unwrap();
        assert_eq!(count.value(), Value::Integer(1));

        view::insert(&orders, &[Value::Integer(2), Value::Integer(20)]).unwrap();
        assert_eq!(count.value(), Value::Integer(2));

        view::delete_where(&orders, &["id"], &[Value::Integer(1)]).unwrap();
        assert_eq!(count.value(), Value::Integer(1));
    }

    #[test]
    fn test_column_value_onchange_fires() {
        let gateway = Rc::new(rsql_gateway::StoreGateway::open_in_memory(GatewayConfig::in_memory()).unwrap());
        let orders = crate::view::base_table::open(&gateway, orders_table()).unwrap();
        let count = view::count(&orders).unwrap();

        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_clone = seen.clone();
        count.onchange(move |v| seen_clone.borrow_mut().push(v.clone()));

        view::insert(&orders, &[Value::Integer(1), Value::Integer(10)]).unwrap();
        view::insert(&orders, &[Value::Integer(2), Value::Integer(20)]).unwrap();

        assert_eq!(*seen.borrow(), vec![Value::Integer(1), Value::Integer(2)]);
    }

    #[test]
    fn test_column_value_onvalue_fires_immediately() {
        let gateway = Rc::new(rsql_gateway::StoreGateway::open_in_memory(GatewayConfig::in_memory()).unwrap());
        let orders = crate::view::base_table::open(&gateway, orders_table()).unwrap();
        let count = view::count(&orders).unwrap();

        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_clone = seen.clone();
        count.onvalue(move |v| seen_clone.borrow_mut().push(v.clone()));

        assert_eq!(*seen.borrow(), vec![Value::Integer(0)]);
    }

    #[test]
    fn test_map_value_recomputes_on_change() {
        let gateway = Rc::new(rsql_gateway::StoreGateway::open_in_memory(GatewayConfig::in_memory()).unwrap());
        let orders = crate::view::base_table::open(&gateway, orders_table()).unwrap();
        let count = view::count(&orders).unwrap();
        let doubled = count.map(|v| Value::Integer(v.as_i64().unwrap_or(0) * 2));
        assert_eq!(doubled.value(), Value::Integer(0));

        view::insert(&orders, &[Value::Integer(1), Value::Integer(10)]).unwrap();
        assert_eq!(doubled.value(), Value::Integer(2));
    }

    #[test]
    fn test_row_value_wraps_single_row_and_updates() {
        let gateway = Rc::new(rsql_gateway::StoreGateway::open_in_memory(GatewayConfig::in_memory()).unwrap());
        let orders = crate::view::base_table::open(&gateway, orders_table()).unwrap();
        let first = view::where_(&orders, None, &[("id", Value::Integer(1))]).unwrap();
        let row = only(&first).unwrap();
        assert_eq!(row.value(), None);

        view::insert(&orders, &[Value::Integer(1), Value::Integer(10)]).unwrap();
        let current = row.value().expect("row present after insert");
        assert_eq!(current.get(1), Some(&Value::Integer(10)));

        view::delete_where(&orders, &["id"], &[Value::Integer(1)]).unwrap();
        assert_eq!(row.value(), None);
    }
}

use std::{future::Future, pin::Pin, sync::Arc};

use log::*;

use crate::{
    db_types::Order,
    events::{EventHandler, EventProducer, Handler, OrderAnnulledEvent, OrderModifiedEvent, OrderPaidEvent},
};

type BoxedHook<E> = dyn (Fn(E) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static;

/// The publishing side of the event hooks. Cheap to clone; every API holds one.
#[derive(Default, Clone)]
pub struct EventProducers {
    pub order_paid_producer: Vec<EventProducer<OrderPaidEvent>>,
    pub order_annulled_producer: Vec<EventProducer<OrderAnnulledEvent>>,
    pub order_modified_producer: Vec<EventProducer<OrderModifiedEvent>>,
}

impl EventProducers {
    pub async fn publish_order_paid(&self, order: &Order) {
        for producer in &self.order_paid_producer {
            debug!("📬️ Notifying order paid hook subscribers of [{}]", order.id);
            producer.publish_event(OrderPaidEvent::new(order.clone())).await;
        }
    }

    pub async fn publish_order_annulled(&self, order: &Order) {
        for producer in &self.order_annulled_producer {
            debug!("📬️ Notifying order annulled hook subscribers of [{}]", order.id);
            producer.publish_event(OrderAnnulledEvent::new(order.clone())).await;
        }
    }

    pub async fn publish_order_modified(&self, actor: &str, old_order: &Order, new_order: &Order) {
        for producer in &self.order_modified_producer {
            debug!("📬️ Notifying order modified hook subscribers of [{}]", new_order.id);
            producer.publish_event(OrderModifiedEvent::new(actor, old_order.clone(), new_order.clone())).await;
        }
    }
}

pub struct EventHandlers {
    pub on_order_paid: Option<EventHandler<OrderPaidEvent>>,
    pub on_order_annulled: Option<EventHandler<OrderAnnulledEvent>>,
    pub on_order_modified: Option<EventHandler<OrderModifiedEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        let on_order_paid = hooks.on_order_paid.map(|f| EventHandler::new(buffer_size, f));
        let on_order_annulled = hooks.on_order_annulled.map(|f| EventHandler::new(buffer_size, f));
        let on_order_modified = hooks.on_order_modified.map(|f| EventHandler::new(buffer_size, f));
        Self { on_order_paid, on_order_annulled, on_order_modified }
    }

    pub fn producers(&self) -> EventProducers {
        let mut result = EventProducers::default();
        if let Some(handler) = &self.on_order_paid {
            result.order_paid_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_order_annulled {
            result.order_annulled_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_order_modified {
            result.order_modified_producer.push(handler.subscribe());
        }
        result
    }

    /// Spawns every configured handler onto the runtime. Each one exits once all of its producers are dropped.
    pub fn start_handlers(self) {
        if let Some(handler) = self.on_order_paid {
            tokio::spawn(handler.start_handler());
        }
        if let Some(handler) = self.on_order_annulled {
            tokio::spawn(handler.start_handler());
        }
        if let Some(handler) = self.on_order_modified {
            tokio::spawn(handler.start_handler());
        }
    }
}

#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_order_paid: Option<Handler<OrderPaidEvent>>,
    pub on_order_annulled: Option<Handler<OrderAnnulledEvent>>,
    pub on_order_modified: Option<Handler<OrderModifiedEvent>>,
}

impl EventHooks {
    pub fn on_order_paid<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(OrderPaidEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        let hook: Arc<BoxedHook<OrderPaidEvent>> = Arc::new(f);
        self.on_order_paid = Some(hook);
        self
    }

    pub fn on_order_annulled<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(OrderAnnulledEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        let hook: Arc<BoxedHook<OrderAnnulledEvent>> = Arc::new(f);
        self.on_order_annulled = Some(hook);
        self
    }

    pub fn on_order_modified<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(OrderModifiedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        let hook: Arc<BoxedHook<OrderModifiedEvent>> = Arc::new(f);
        self.on_order_modified = Some(hook);
        self
    }
}

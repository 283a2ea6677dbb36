//! OKEx adapter scenarios against a scripted exchange.

use std::sync::Arc;

use arbx_adapter::{
    AdapterError, OkexAdapter, OkexAdapterConfig, OrderLifecycleAdapter, MAX_QUOTES_PER_SIDE,
    OKEX_BROKER,
};
use arbx_core::{
    Broker, CashMarginType, Order, OrderSide, OrderStatus, OrderType, Price, QuoteSide, Size,
};
use arbx_exchange::{
    BalanceEntry, Balances, ExchangeError, MockCall, MockExchangeClient, OrderBookResponse,
    OrderRequestResponse, OrderResponse, RemoteOrderStatus, TradeRecord,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::json;

const SENT_AT_MS: i64 = 1_700_000_000_000;

fn setup() -> (Arc<MockExchangeClient>, OkexAdapter) {
    let mock = Arc::new(MockExchangeClient::new());
    let adapter = OkexAdapter::new(mock.clone(), OkexAdapterConfig::default());
    (mock, adapter)
}

fn limit_order(size: Decimal) -> Order {
    Order::new(
        Broker::new(OKEX_BROKER),
        "BTC/USDT",
        OrderSide::Buy,
        OrderType::Limit,
        CashMarginType::Cash,
        Price::new(dec!(30000)),
        Size::new(size),
    )
    .unwrap()
}

fn ack(id: &str) -> OrderRequestResponse {
    OrderRequestResponse { id: id.to_string() }
}

fn order_state(id: &str, status: RemoteOrderStatus, filled: Decimal) -> OrderResponse {
    OrderResponse {
        id: id.to_string(),
        symbol: "BTC/USDT".to_string(),
        status,
        filled,
        amount: None,
        price: None,
        average: None,
    }
}

fn trade(order_id: &str, amount: Decimal, price: Decimal, offset_ms: i64) -> TradeRecord {
    TradeRecord {
        order_id: Some(order_id.to_string()),
        amount,
        price,
        timestamp: SENT_AT_MS + offset_ms,
    }
}

async fn sent_order(mock: &MockExchangeClient, adapter: &OkexAdapter, size: Decimal) -> Order {
    let mut order = limit_order(size);
    mock.push_create_order(Ok(ack("okx-1")));
    adapter.send(&mut order).await.unwrap();
    mock.clear_calls();
    order
}

#[tokio::test]
async fn send_assigns_exchange_id_and_marks_new() {
    let (mock, adapter) = setup();
    let mut order = limit_order(dec!(10));
    mock.push_create_order(Ok(ack("okx-1")));

    adapter.send(&mut order).await.unwrap();

    assert_eq!(order.status(), OrderStatus::New);
    assert_eq!(order.broker_order_id().map(|id| id.as_str()), Some("okx-1"));
    assert!(order.sent_time().is_some());
    assert_eq!(order.last_updated(), order.sent_time());

    match &mock.calls()[0] {
        MockCall::CreateOrder(request) => {
            assert_eq!(request.symbol, "BTC/USDT");
            assert_eq!(request.order_type, "limit");
            assert_eq!(request.side, "buy");
            assert_eq!(request.price, dec!(30000));
            assert_eq!(request.amount, dec!(10));
        }
        other => panic!("unexpected call {other:?}"),
    }
}

#[tokio::test]
async fn send_market_order_forces_zero_price() {
    let (mock, adapter) = setup();
    let mut order = Order::new(
        Broker::new(OKEX_BROKER),
        "BTC/USDT",
        OrderSide::Sell,
        OrderType::Market,
        CashMarginType::Cash,
        Price::new(dec!(123)),
        Size::new(dec!(1)),
    )
    .unwrap();
    mock.push_create_order(Ok(ack("okx-2")));

    adapter.send(&mut order).await.unwrap();

    match &mock.calls()[0] {
        MockCall::CreateOrder(request) => {
            assert_eq!(request.order_type, "market");
            assert_eq!(request.side, "sell");
            assert_eq!(request.price, Decimal::ZERO);
        }
        other => panic!("unexpected call {other:?}"),
    }
}

#[tokio::test]
async fn send_rejects_foreign_broker_without_remote_call() {
    let (mock, adapter) = setup();
    let mut order = Order::new(
        Broker::new("Binance"),
        "BTC/USDT",
        OrderSide::Buy,
        OrderType::Limit,
        CashMarginType::Cash,
        Price::new(dec!(30000)),
        Size::new(dec!(1)),
    )
    .unwrap();

    let err = adapter.send(&mut order).await.unwrap_err();

    assert!(matches!(err, AdapterError::BrokerMismatch { .. }));
    assert!(err.is_validation());
    assert!(mock.calls().is_empty());
    assert_eq!(order.status(), OrderStatus::Pending);
}

#[tokio::test]
async fn send_rejects_margin_orders() {
    let (mock, adapter) = setup();
    let mut order = Order::new(
        Broker::new(OKEX_BROKER),
        "BTC/USDT",
        OrderSide::Buy,
        OrderType::Limit,
        CashMarginType::NetOut,
        Price::new(dec!(30000)),
        Size::new(dec!(1)),
    )
    .unwrap();

    let err = adapter.send(&mut order).await.unwrap_err();

    assert!(matches!(err, AdapterError::NotImplemented(_)));
    assert!(mock.calls().is_empty());
}

#[tokio::test]
async fn send_failure_leaves_order_untouched() {
    let (mock, adapter) = setup();
    let mut order = limit_order(dec!(1));
    let before = order.clone();
    mock.push_create_order(Err(ExchangeError::Http("connection reset".to_string())));

    let err = adapter.send(&mut order).await.unwrap_err();

    assert!(matches!(err, AdapterError::Exchange(ExchangeError::Http(_))));
    assert!(err.is_retryable());
    assert_eq!(order, before);
    assert!(order.broker_order_id().is_none());
}

#[tokio::test]
async fn send_twice_is_rejected() {
    let (mock, adapter) = setup();
    let mut order = sent_order(&mock, &adapter, dec!(1)).await;

    let err = adapter.send(&mut order).await.unwrap_err();

    assert!(matches!(err, AdapterError::AlreadySent(_)));
    assert!(mock.calls().is_empty());
}

#[tokio::test]
async fn refresh_full_fill_marks_filled() {
    let (mock, adapter) = setup();
    let mut order = sent_order(&mock, &adapter, dec!(10)).await;
    mock.push_fetch_order(Ok(order_state("okx-1", RemoteOrderStatus::Closed, dec!(10))));
    mock.push_fetch_trades(Ok(vec![
        trade("okx-1", dec!(6), dec!(30000), 1),
        trade("okx-1", dec!(4), dec!(30001), 2),
    ]));

    adapter.refresh(&mut order).await.unwrap();

    assert_eq!(order.status(), OrderStatus::Filled);
    assert_eq!(order.filled_size(), Size::new(dec!(10)));
    assert_eq!(order.executions().len(), 2);
    assert_eq!(order.executions()[0].size, Size::new(dec!(6)));
    assert_eq!(order.executions()[1].price, Price::new(dec!(30001)));
    assert_eq!(
        order.executions()[1].exec_time.timestamp_millis(),
        SENT_AT_MS + 2
    );
    assert!(order.last_updated() >= order.sent_time());
}

#[tokio::test]
async fn refresh_partial_fill_marks_partially_filled() {
    let (mock, adapter) = setup();
    let mut order = sent_order(&mock, &adapter, dec!(10)).await;
    mock.push_fetch_order(Ok(order_state("okx-1", RemoteOrderStatus::Open, dec!(4))));
    mock.push_fetch_trades(Ok(vec![trade("okx-1", dec!(4), dec!(30000), 1)]));

    adapter.refresh(&mut order).await.unwrap();

    assert_eq!(order.status(), OrderStatus::PartiallyFilled);
    assert_eq!(order.filled_size(), Size::new(dec!(4)));
    assert_eq!(order.remaining_size(), Size::new(dec!(6)));
}

#[tokio::test]
async fn refresh_without_fills_keeps_new() {
    let (mock, adapter) = setup();
    let mut order = sent_order(&mock, &adapter, dec!(10)).await;
    mock.push_fetch_order(Ok(order_state("okx-1", RemoteOrderStatus::Open, dec!(0))));
    mock.push_fetch_trades(Ok(vec![]));

    adapter.refresh(&mut order).await.unwrap();

    assert_eq!(order.status(), OrderStatus::New);
    assert!(order.executions().is_empty());
}

#[tokio::test]
async fn refresh_canceled_wins_over_full_fill() {
    let (mock, adapter) = setup();
    let mut order = sent_order(&mock, &adapter, dec!(10)).await;
    mock.push_fetch_order(Ok(order_state(
        "okx-1",
        RemoteOrderStatus::from_exchange("CANCELED"),
        dec!(10),
    )));
    mock.push_fetch_trades(Ok(vec![]));

    adapter.refresh(&mut order).await.unwrap();

    assert_eq!(order.status(), OrderStatus::Canceled);
    assert_eq!(order.filled_size(), Size::new(dec!(10)));
}

#[tokio::test]
async fn refresh_expired() {
    let (mock, adapter) = setup();
    let mut order = sent_order(&mock, &adapter, dec!(10)).await;
    mock.push_fetch_order(Ok(order_state(
        "okx-1",
        RemoteOrderStatus::from_exchange("EXPIRED"),
        dec!(3),
    )));
    mock.push_fetch_trades(Ok(vec![]));

    adapter.refresh(&mut order).await.unwrap();

    assert_eq!(order.status(), OrderStatus::Expired);
}

#[tokio::test]
async fn refresh_rounds_reported_fill() {
    let (mock, adapter) = setup();
    let mut order = sent_order(&mock, &adapter, dec!(0.3)).await;
    mock.push_fetch_order(Ok(order_state(
        "okx-1",
        RemoteOrderStatus::Open,
        dec!(0.30000000000000004),
    )));
    mock.push_fetch_trades(Ok(vec![]));

    adapter.refresh(&mut order).await.unwrap();

    assert_eq!(order.filled_size(), Size::new(dec!(0.3)));
    assert_eq!(order.status(), OrderStatus::Filled);
}

#[tokio::test]
async fn refresh_excludes_foreign_trades() {
    let (mock, adapter) = setup();
    let mut order = sent_order(&mock, &adapter, dec!(10)).await;
    mock.push_fetch_order(Ok(order_state("okx-1", RemoteOrderStatus::Open, dec!(2))));
    mock.push_fetch_trades(Ok(vec![
        trade("okx-1", dec!(2), dec!(30000), 1),
        trade("okx-other", dec!(5), dec!(29000), 2),
        TradeRecord {
            order_id: None,
            amount: dec!(1),
            price: dec!(29500),
            timestamp: SENT_AT_MS + 3,
        },
    ]));

    adapter.refresh(&mut order).await.unwrap();

    assert_eq!(order.executions().len(), 1);
    assert_eq!(order.executions()[0].size, Size::new(dec!(2)));
    assert_eq!(&order.executions()[0].order_id, order.id());

    match &mock.calls()[1] {
        MockCall::FetchTrades(query) => {
            assert_eq!(query.symbol, "BTC/USDT");
            assert_eq!(query.order_id.as_deref(), Some("okx-1"));
            assert_eq!(query.limit, Some(100));
            assert_eq!(query.since, None);
        }
        other => panic!("unexpected call {other:?}"),
    }
}

#[tokio::test]
async fn refresh_keeps_fill_stamped_before_local_send_time() {
    let (mock, adapter) = setup();
    let mut order = sent_order(&mock, &adapter, dec!(1)).await;
    let sent_ms = order.sent_time().unwrap().timestamp_millis();
    mock.push_fetch_order(Ok(order_state("okx-1", RemoteOrderStatus::Closed, dec!(1))));
    mock.push_fetch_trades(Ok(vec![TradeRecord {
        order_id: Some("okx-1".to_string()),
        amount: dec!(1),
        price: dec!(30000),
        timestamp: sent_ms - 1,
    }]));

    adapter.refresh(&mut order).await.unwrap();

    assert_eq!(order.status(), OrderStatus::Filled);
    assert_eq!(order.executions().len(), 1);
    assert_eq!(order.executions()[0].size, Size::new(dec!(1)));
    assert_eq!(
        order.executions()[0].exec_time.timestamp_millis(),
        sent_ms - 1
    );
}

#[tokio::test]
async fn refresh_never_lets_executions_exceed_size() {
    let (mock, adapter) = setup();
    let mut order = sent_order(&mock, &adapter, dec!(10)).await;
    mock.push_fetch_order(Ok(order_state("okx-1", RemoteOrderStatus::Closed, dec!(10))));
    mock.push_fetch_trades(Ok(vec![
        trade("okx-1", dec!(6), dec!(30000), 1),
        trade("okx-1", dec!(6), dec!(30000), 2),
        trade("okx-1", dec!(1), dec!(30000), 3),
    ]));

    adapter.refresh(&mut order).await.unwrap();

    let total: Size = order.executions().iter().map(|e| e.size).sum();
    assert_eq!(total, Size::new(dec!(10)));
    assert_eq!(order.executions().len(), 2);
}

#[tokio::test]
async fn refresh_filled_size_is_monotonic_and_bounded() {
    let (mock, adapter) = setup();
    let mut order = sent_order(&mock, &adapter, dec!(10)).await;

    mock.push_fetch_order(Ok(order_state("okx-1", RemoteOrderStatus::Open, dec!(4))));
    mock.push_fetch_trades(Ok(vec![]));
    adapter.refresh(&mut order).await.unwrap();

    mock.push_fetch_order(Ok(order_state("okx-1", RemoteOrderStatus::Open, dec!(2))));
    mock.push_fetch_trades(Ok(vec![]));
    adapter.refresh(&mut order).await.unwrap();
    assert_eq!(order.filled_size(), Size::new(dec!(4)));

    mock.push_fetch_order(Ok(order_state("okx-1", RemoteOrderStatus::Open, dec!(12))));
    mock.push_fetch_trades(Ok(vec![]));
    adapter.refresh(&mut order).await.unwrap();
    assert_eq!(order.filled_size(), Size::new(dec!(10)));
    assert_eq!(order.status(), OrderStatus::Filled);
}

#[tokio::test]
async fn refresh_failure_leaves_order_untouched() {
    let (mock, adapter) = setup();
    let mut order = sent_order(&mock, &adapter, dec!(10)).await;
    let before = order.clone();
    mock.push_fetch_order(Ok(order_state("okx-1", RemoteOrderStatus::Open, dec!(4))));
    mock.push_fetch_trades(Err(ExchangeError::Http("timeout".to_string())));

    assert!(adapter.refresh(&mut order).await.is_err());
    assert_eq!(order, before);
}

#[tokio::test]
async fn refresh_before_send_is_rejected() {
    let (mock, adapter) = setup();
    let mut order = limit_order(dec!(1));

    let err = adapter.refresh(&mut order).await.unwrap_err();

    assert!(matches!(err, AdapterError::OrderNotSent(_)));
    assert!(mock.calls().is_empty());
}

#[tokio::test]
async fn terminal_status_is_sticky_across_refresh() {
    let (mock, adapter) = setup();
    let mut order = sent_order(&mock, &adapter, dec!(10)).await;
    mock.push_cancel_order(Ok(ack("okx-1")));
    adapter.cancel(&mut order).await.unwrap();

    mock.push_fetch_order(Ok(order_state("okx-1", RemoteOrderStatus::Open, dec!(10))));
    mock.push_fetch_trades(Ok(vec![trade("okx-1", dec!(10), dec!(30000), 1)]));
    adapter.refresh(&mut order).await.unwrap();

    assert_eq!(order.status(), OrderStatus::Canceled);
    assert_eq!(order.filled_size(), Size::new(dec!(10)));
    assert_eq!(order.executions().len(), 1);
}

#[tokio::test]
async fn cancel_marks_canceled() {
    let (mock, adapter) = setup();
    let mut order = sent_order(&mock, &adapter, dec!(10)).await;
    let sent_time = order.sent_time();
    mock.push_cancel_order(Ok(ack("okx-1")));

    adapter.cancel(&mut order).await.unwrap();

    assert_eq!(order.status(), OrderStatus::Canceled);
    assert!(order.last_updated() >= sent_time);
    assert_eq!(
        mock.calls(),
        vec![MockCall::CancelOrder {
            id: "okx-1".to_string(),
            symbol: "BTC/USDT".to_string(),
        }]
    );
}

#[tokio::test]
async fn cancel_partially_filled_order() {
    let (mock, adapter) = setup();
    let mut order = sent_order(&mock, &adapter, dec!(10)).await;
    mock.push_fetch_order(Ok(order_state("okx-1", RemoteOrderStatus::Open, dec!(4))));
    mock.push_fetch_trades(Ok(vec![]));
    adapter.refresh(&mut order).await.unwrap();
    mock.push_cancel_order(Ok(ack("okx-1")));

    adapter.cancel(&mut order).await.unwrap();

    assert_eq!(order.status(), OrderStatus::Canceled);
}

#[tokio::test]
async fn cancel_failure_leaves_status() {
    let (mock, adapter) = setup();
    let mut order = sent_order(&mock, &adapter, dec!(10)).await;
    mock.push_cancel_order(Err(ExchangeError::Api {
        code: "51400".to_string(),
        msg: "Cancellation failed".to_string(),
    }));

    let err = adapter.cancel(&mut order).await.unwrap_err();

    assert!(!err.is_retryable());
    assert_eq!(order.status(), OrderStatus::New);
}

#[tokio::test]
async fn cancel_terminal_order_is_rejected() {
    let (mock, adapter) = setup();
    let mut order = sent_order(&mock, &adapter, dec!(10)).await;
    mock.push_fetch_order(Ok(order_state("okx-1", RemoteOrderStatus::Closed, dec!(10))));
    mock.push_fetch_trades(Ok(vec![]));
    adapter.refresh(&mut order).await.unwrap();
    mock.clear_calls();

    let err = adapter.cancel(&mut order).await.unwrap_err();

    assert!(matches!(
        err,
        AdapterError::OrderTerminal {
            status: OrderStatus::Filled,
            ..
        }
    ));
    assert!(mock.calls().is_empty());
}

#[tokio::test]
async fn fetch_quotes_caps_each_side_and_coerces_numbers() {
    let (mock, adapter) = setup();
    let asks = (0..150)
        .map(|i| vec![json!(format!("{}", 30000 + i)), json!("0.5")])
        .collect();
    let bids = (0..150)
        .map(|i| vec![json!(29999 - i), json!(0.25)])
        .collect();
    mock.push_fetch_order_book(Ok(OrderBookResponse {
        asks,
        bids,
        timestamp: None,
    }));

    let quotes = adapter.fetch_quotes().await.unwrap();

    assert_eq!(quotes.len(), 200);
    assert!(quotes[..100].iter().all(|q| q.side == QuoteSide::Ask));
    assert!(quotes[100..].iter().all(|q| q.side == QuoteSide::Bid));
    assert!(quotes.iter().all(|q| q.broker == Broker::new(OKEX_BROKER)));
    assert_eq!(quotes[0].price, Price::new(dec!(30000)));
    assert_eq!(quotes[0].volume, Size::new(dec!(0.5)));
    assert_eq!(quotes[99].price, Price::new(dec!(30099)));
    assert_eq!(quotes[100].price, Price::new(dec!(29999)));
    assert_eq!(quotes[100].volume, Size::new(dec!(0.25)));
    assert_eq!(
        mock.calls(),
        vec![MockCall::FetchOrderBook {
            pair: "BTC/USDT".to_string()
        }]
    );
}

#[tokio::test]
async fn fetch_quotes_depth_never_exceeds_cap() {
    let mock = Arc::new(MockExchangeClient::new());
    let adapter = OkexAdapter::new(
        mock.clone(),
        OkexAdapterConfig {
            quote_depth: 150,
            ..OkexAdapterConfig::default()
        },
    );
    let levels: Vec<Vec<serde_json::Value>> = (0..150)
        .map(|i| vec![json!(30000 + i), json!("1")])
        .collect();
    mock.push_fetch_order_book(Ok(OrderBookResponse {
        asks: levels.clone(),
        bids: levels,
        timestamp: None,
    }));

    let quotes = adapter.fetch_quotes().await.unwrap();

    assert_eq!(quotes.len(), 2 * MAX_QUOTES_PER_SIDE);
    let asks = quotes.iter().filter(|q| q.side == QuoteSide::Ask).count();
    assert_eq!(asks, MAX_QUOTES_PER_SIDE);
}

#[tokio::test]
async fn fetch_quotes_short_book() {
    let (mock, adapter) = setup();
    mock.push_fetch_order_book(Ok(OrderBookResponse {
        asks: vec![vec![json!("101"), json!("1")]],
        bids: vec![],
        timestamp: None,
    }));

    let quotes = adapter.fetch_quotes().await.unwrap();

    assert_eq!(quotes.len(), 1);
    assert_eq!(quotes[0].side, QuoteSide::Ask);
}

#[tokio::test]
async fn get_position_returns_free_balance() {
    let (mock, adapter) = setup();
    let mut balances = Balances::new();
    balances.insert(
        "BTC".to_string(),
        BalanceEntry {
            free: dec!(1.25),
            used: dec!(0.75),
            total: dec!(2),
        },
    );
    mock.push_fetch_balance(Ok(balances));

    assert_eq!(adapter.get_position().await.unwrap(), Size::new(dec!(1.25)));
}

#[tokio::test]
async fn get_position_missing_asset() {
    let (mock, adapter) = setup();
    mock.push_fetch_balance(Ok(Balances::new()));

    let err = adapter.get_position().await.unwrap_err();

    assert!(matches!(err, AdapterError::AssetNotFound(ref asset) if asset == "BTC"));
    assert!(!err.is_validation());
}

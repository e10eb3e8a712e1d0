//! Order aggregation and statistics.
//!
//! This module reduces a fetched order sequence to the dashboard rollup.
//! Everything here is pure: same orders in, same summary out.

use crate::models::{
    AnalyticsSummary, CustomerSegment, CustomerSegmentCounts, FinancialStatus, FulfillmentStatus,
    LocationAggregate, MonthlyBucket, OrderRecord, ProductAggregate,
};
use chrono::Datelike;
use rust_decimal::{Decimal, RoundingStrategy};
use std::collections::HashMap;
use tracing::debug;

/// Short month labels, January first.
pub const MONTH_LABELS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Location label used when an order has no shipping city.
pub const UNKNOWN_LOCATION: &str = "Unknown";

/// Default length of the top product and location lists.
pub const DEFAULT_TOP_N: usize = 10;

/// Accumulator keyed by label that remembers first-encounter order.
struct Ranked<T> {
    index: HashMap<String, usize>,
    entries: Vec<T>,
}

impl<T> Ranked<T> {
    fn new() -> Self {
        Self {
            index: HashMap::new(),
            entries: Vec::new(),
        }
    }

    fn entry(&mut self, key: &str, init: impl FnOnce() -> T) -> &mut T {
        let slot = match self.index.get(key) {
            Some(&slot) => slot,
            None => {
                self.entries.push(init());
                self.index.insert(key.to_string(), self.entries.len() - 1);
                self.entries.len() - 1
            }
        };
        &mut self.entries[slot]
    }

    /// Sort descending by `key`, keeping encounter order on ties, and keep `n`.
    fn top_by(mut self, n: usize, key: impl Fn(&T) -> u64) -> Vec<T> {
        // sort_by_key is stable
        self.entries.sort_by_key(|e| std::cmp::Reverse(key(e)));
        self.entries.truncate(n);
        self.entries
    }
}

/// Build the analytics summary for `year` from a fetched order sequence.
///
/// Orders outside `year` still count toward the totals, products,
/// locations and segments but are left out of the monthly buckets.
pub fn summarize(orders: &[OrderRecord], year: i32, top_n: usize) -> AnalyticsSummary {
    let mut months: [(u64, Decimal); 12] = [(0, Decimal::ZERO); 12];
    let mut products: Ranked<ProductAggregate> = Ranked::new();
    let mut locations: Ranked<LocationAggregate> = Ranked::new();
    let mut customers: HashMap<&str, u64> = HashMap::new();

    let mut total_revenue = Decimal::ZERO;
    let mut fulfilled_orders = 0;
    let mut paid_orders = 0;

    for order in orders {
        let amount = order.total.amount;
        total_revenue += amount;

        if order.fulfillment_status == FulfillmentStatus::Fulfilled {
            fulfilled_orders += 1;
        }
        if order.financial_status == FinancialStatus::Paid {
            paid_orders += 1;
        }

        match order.reporting_time() {
            Some(at) if at.year() == year => {
                let bucket = &mut months[at.month0() as usize];
                bucket.0 += 1;
                bucket.1 += amount;
            }
            Some(_) => {}
            None => debug!("Order {} has no timestamp, left out of monthly buckets", order.id),
        }

        if let Some(ref customer) = order.customer_id {
            *customers.entry(customer.as_str()).or_default() += 1;
        }

        for item in &order.line_items {
            let product = products.entry(&item.title, || ProductAggregate {
                title: item.title.clone(),
                quantity: 0,
                revenue: Decimal::ZERO,
                orders: 0,
            });
            product.quantity += item.quantity;
            product.revenue += Decimal::from(item.quantity) * item.unit_price;
            product.orders += 1;
        }

        let city = shipping_city(order);
        let location = locations.entry(city, || LocationAggregate {
            location: city.to_string(),
            orders: 0,
            revenue: Decimal::ZERO,
        });
        location.orders += 1;
        location.revenue += amount;
    }

    let total_orders = orders.len() as u64;

    AnalyticsSummary {
        total_orders,
        total_revenue,
        average_order_value: average_order_value(total_revenue, total_orders),
        fulfilled_orders,
        paid_orders,
        monthly_data: MONTH_LABELS
            .iter()
            .zip(months)
            .map(|(label, (orders, revenue))| MonthlyBucket {
                month: label.to_string(),
                orders,
                revenue,
            })
            .collect(),
        top_products: products.top_by(top_n, |p| p.quantity),
        top_locations: locations.top_by(top_n, |l| l.orders),
        customer_segments: segment_customers(customers.values().copied()),
    }
}

/// Revenue per order rounded to cents. Zero orders yields zero.
pub fn average_order_value(revenue: Decimal, orders: u64) -> Decimal {
    if orders == 0 {
        return Decimal::ZERO;
    }

    (revenue / Decimal::from(orders)).round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Count customers per segment from their order counts.
pub fn segment_customers(order_counts: impl IntoIterator<Item = u64>) -> CustomerSegmentCounts {
    let mut counts = CustomerSegmentCounts::default();

    for count in order_counts {
        if let Some(segment) = CustomerSegment::for_order_count(count) {
            counts.record(segment);
        }
    }

    counts
}

fn shipping_city(order: &OrderRecord) -> &str {
    order
        .shipping
        .as_ref()
        .and_then(|s| s.city.as_deref())
        .filter(|city| !city.trim().is_empty())
        .unwrap_or(UNKNOWN_LOCATION)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LineItem, Money, ShippingLocation};
    use chrono::{TimeZone, Utc};

    fn dollars(amount: i64) -> Decimal {
        Decimal::from(amount)
    }

    fn create_test_order(
        id: &str,
        total: i64,
        month: u32,
        day: u32,
        customer: Option<&str>,
        items: &[(&str, u64, i64)],
        city: Option<&str>,
    ) -> OrderRecord {
        let at = Utc.with_ymd_and_hms(2024, month, day, 12, 0, 0).unwrap();
        OrderRecord {
            id: id.to_string(),
            created_at: Some(at),
            processed_at: Some(at),
            total: Money::new(dollars(total), "USD"),
            fulfillment_status: FulfillmentStatus::Unfulfilled,
            financial_status: FinancialStatus::Unpaid,
            customer_id: customer.map(String::from),
            line_items: items
                .iter()
                .map(|(title, quantity, price)| LineItem {
                    product_id: None,
                    title: title.to_string(),
                    quantity: *quantity,
                    unit_price: dollars(*price),
                })
                .collect(),
            shipping: city.map(|c| ShippingLocation {
                city: Some(c.to_string()),
                region: None,
                country: Some("US".to_string()),
            }),
        }
    }

    #[test]
    fn test_empty_orders() {
        let summary = summarize(&[], 2024, DEFAULT_TOP_N);

        assert_eq!(summary.total_orders, 0);
        assert_eq!(summary.total_revenue, Decimal::ZERO);
        assert_eq!(summary.average_order_value, Decimal::ZERO);
        assert_eq!(summary.monthly_data.len(), 12);
        assert!(summary
            .monthly_data
            .iter()
            .all(|b| b.orders == 0 && b.revenue.is_zero()));
        assert!(summary.top_products.is_empty());
        assert!(summary.top_locations.is_empty());
        assert_eq!(summary.customer_segments.total(), 0);
    }

    #[test]
    fn test_end_to_end_scenario() {
        let mut a = create_test_order(
            "A",
            100,
            3,
            1,
            Some("c1"),
            &[("Widget", 2, 50)],
            Some("Springfield"),
        );
        a.financial_status = FinancialStatus::Paid;
        a.fulfillment_status = FulfillmentStatus::Fulfilled;

        let b = create_test_order(
            "B",
            50,
            3,
            15,
            Some("c1"),
            &[("Widget", 1, 50)],
            Some("Springfield"),
        );

        let mut c = create_test_order(
            "C",
            200,
            4,
            2,
            Some("c2"),
            &[("Gadget", 4, 50)],
            Some("Shelbyville"),
        );
        c.financial_status = FinancialStatus::Paid;
        c.fulfillment_status = FulfillmentStatus::Fulfilled;

        let summary = summarize(&[a, b, c], 2024, DEFAULT_TOP_N);

        assert_eq!(summary.total_orders, 3);
        assert_eq!(summary.total_revenue, dollars(350));
        assert_eq!(summary.average_order_value, Decimal::new(11667, 2));
        assert_eq!(summary.fulfilled_orders, 2);
        assert_eq!(summary.paid_orders, 2);

        let march = &summary.monthly_data[2];
        assert_eq!(march.month, "Mar");
        assert_eq!(march.orders, 2);
        assert_eq!(march.revenue, dollars(150));
        let april = &summary.monthly_data[3];
        assert_eq!(april.orders, 1);
        assert_eq!(april.revenue, dollars(200));

        assert_eq!(summary.top_products[0].title, "Gadget");
        assert_eq!(summary.top_products[0].quantity, 4);
        assert_eq!(summary.top_products[1].title, "Widget");
        assert_eq!(summary.top_products[1].quantity, 3);
        assert_eq!(summary.top_products[1].revenue, dollars(150));
        assert_eq!(summary.top_products[1].orders, 2);

        assert_eq!(summary.customer_segments.returning, 1);
        assert_eq!(summary.customer_segments.new, 1);
        assert_eq!(summary.customer_segments.vip, 0);

        assert_eq!(summary.top_locations[0].location, "Springfield");
        assert_eq!(summary.top_locations[0].orders, 2);
        assert_eq!(summary.top_locations[1].location, "Shelbyville");
        assert_eq!(summary.top_locations[1].orders, 1);
    }

    #[test]
    fn test_segment_boundaries() {
        let mut orders = Vec::new();
        for (customer, count) in [("one", 1), ("four", 4), ("five", 5)] {
            for i in 0..count {
                orders.push(create_test_order(
                    &format!("{}-{}", customer, i),
                    10,
                    1,
                    1,
                    Some(customer),
                    &[],
                    None,
                ));
            }
        }

        let summary = summarize(&orders, 2024, DEFAULT_TOP_N);

        assert_eq!(summary.customer_segments.new, 1);
        assert_eq!(summary.customer_segments.returning, 1);
        assert_eq!(summary.customer_segments.vip, 1);
    }

    #[test]
    fn test_monthly_zero_fill() {
        let orders = vec![
            create_test_order("m", 30, 3, 10, None, &[], None),
            create_test_order("n", 70, 11, 20, None, &[], None),
        ];

        let summary = summarize(&orders, 2024, DEFAULT_TOP_N);

        assert_eq!(summary.monthly_data.len(), 12);
        let labels: Vec<_> = summary.monthly_data.iter().map(|b| b.month.as_str()).collect();
        assert_eq!(labels, MONTH_LABELS.to_vec());

        for (i, bucket) in summary.monthly_data.iter().enumerate() {
            match i {
                2 => assert_eq!((bucket.orders, bucket.revenue), (1, dollars(30))),
                10 => assert_eq!((bucket.orders, bucket.revenue), (1, dollars(70))),
                _ => assert_eq!((bucket.orders, bucket.revenue), (0, Decimal::ZERO)),
            }
        }
    }

    #[test]
    fn test_out_of_year_orders_skip_monthly_buckets() {
        let mut stray = create_test_order("old", 40, 12, 31, Some("c9"), &[], None);
        stray.processed_at = Some(Utc.with_ymd_and_hms(2023, 12, 31, 23, 0, 0).unwrap());

        let summary = summarize(&[stray], 2024, DEFAULT_TOP_N);

        assert_eq!(summary.total_orders, 1);
        assert_eq!(summary.total_revenue, dollars(40));
        assert!(summary.monthly_data.iter().all(|b| b.orders == 0));
        assert_eq!(summary.customer_segments.new, 1);
    }

    #[test]
    fn test_untimed_orders_count_everywhere_but_months() {
        let mut untimed = create_test_order("u1", 25, 5, 1, Some("c1"), &[("Mug", 1, 25)], Some("Paris"));
        untimed.created_at = None;
        untimed.processed_at = None;
        let timed = create_test_order("t1", 75, 5, 2, Some("c1"), &[("Mug", 3, 25)], Some("Paris"));

        let summary = summarize(&[untimed, timed], 2024, DEFAULT_TOP_N);

        assert_eq!(summary.total_orders, 2);
        assert_eq!(summary.total_revenue, dollars(100));
        assert_eq!(summary.monthly_data[4].orders, 1);
        assert_eq!(summary.monthly_data[4].revenue, dollars(75));
        assert_eq!(summary.top_products[0].quantity, 4);
        assert_eq!(summary.top_locations[0].orders, 2);
        assert_eq!(summary.customer_segments.returning, 1);
    }

    #[test]
    fn test_stable_ties() {
        let orders = vec![
            create_test_order("1", 10, 5, 1, None, &[("First", 3, 1)], Some("Ogdenville")),
            create_test_order("2", 10, 5, 2, None, &[("Second", 3, 1)], Some("North Haverbrook")),
        ];

        let summary = summarize(&orders, 2024, DEFAULT_TOP_N);

        assert_eq!(summary.top_products[0].title, "First");
        assert_eq!(summary.top_products[1].title, "Second");
        assert_eq!(summary.top_locations[0].location, "Ogdenville");
        assert_eq!(summary.top_locations[1].location, "North Haverbrook");
    }

    #[test]
    fn test_unknown_location_fallback() {
        let mut blank_city = create_test_order("1", 10, 6, 1, None, &[], Some(""));
        blank_city.shipping = Some(ShippingLocation::default());
        let no_address = create_test_order("2", 15, 6, 2, None, &[], None);

        let summary = summarize(&[blank_city, no_address], 2024, DEFAULT_TOP_N);

        assert_eq!(summary.top_locations.len(), 1);
        assert_eq!(summary.top_locations[0].location, UNKNOWN_LOCATION);
        assert_eq!(summary.top_locations[0].orders, 2);
        assert_eq!(summary.top_locations[0].revenue, dollars(25));
    }

    #[test]
    fn test_other_statuses_not_counted() {
        let mut order = create_test_order("1", 10, 1, 1, None, &[], None);
        order.fulfillment_status = FulfillmentStatus::Partial;
        order.financial_status = FinancialStatus::Other("REFUNDED".to_string());

        let summary = summarize(&[order], 2024, DEFAULT_TOP_N);

        assert_eq!(summary.fulfilled_orders, 0);
        assert_eq!(summary.paid_orders, 0);
    }

    #[test]
    fn test_top_n_truncates() {
        let orders: Vec<_> = (0..15)
            .map(|i| {
                let title = format!("Product {}", i);
                create_test_order(&i.to_string(), 5, 1, 1, None, &[(title.as_str(), i + 1, 5)], None)
            })
            .collect();

        let summary = summarize(&orders, 2024, DEFAULT_TOP_N);

        assert_eq!(summary.top_products.len(), 10);
        assert_eq!(summary.top_products[0].title, "Product 14");
        assert_eq!(summary.top_products[9].title, "Product 5");
    }

    #[test]
    fn test_average_order_value_rounding() {
        assert_eq!(average_order_value(dollars(10), 3), Decimal::new(333, 2));
        assert_eq!(average_order_value(dollars(20), 3), Decimal::new(667, 2));
        assert_eq!(average_order_value(dollars(5), 0), Decimal::ZERO);
    }
}

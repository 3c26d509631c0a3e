pub mod order_queries;

pub mod single_flight_cache;

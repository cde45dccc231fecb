pub mod columns;
pub mod feature_schema;
pub mod observation;
pub mod weather_condition;

pub mod gql;
pub mod realtime;

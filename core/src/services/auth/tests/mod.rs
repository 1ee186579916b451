mod policy_tests;
mod service_tests;

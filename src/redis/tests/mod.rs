//! Store module tests, split by command family

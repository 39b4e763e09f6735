pub(crate) mod managed_vec;

pub mod moose_request;

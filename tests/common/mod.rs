pub mod mock_data;
pub mod mock_service;

mod row_test;

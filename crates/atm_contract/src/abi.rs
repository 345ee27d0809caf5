use alloy_sol_types::sol;

// External surface of the deployed ATM contract. The deposit entry point is
// payable so the wei-denominated deployment can take the amount as native
// value; the units deployment ignores the value entirely.
sol! {
    struct HistoryEntry {
        bool isDeposit;
        uint256 amount;
        uint256 timestamp;
    }

    function getBalance() external view returns (uint256);
    function deposit(uint256 amount) external payable;
    function withdraw(uint256 amount) external;
    function transferOwnership(address newOwner) external;
    function increaseBalance(uint256 amount) external;
    function decreaseBalance(uint256 amount) external;
    function getTransactionHistory() external view returns (HistoryEntry[] memory);
}
